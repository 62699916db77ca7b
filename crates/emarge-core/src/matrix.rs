//! In-memory reconciliation of windows, enrollments and signatures.
//!
//! Every function here takes the three bulk reads as input and runs in
//! time linear in their combined size (plus the size of the output).

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::models::enrollment::Enrollment;
use crate::models::signature::SignatureKey;
use crate::models::window::SignatureWindow;

/// Attendance grid: one row per window, one column per enrollment.
///
/// `signed` always has `windows.len()` rows of `enrollments.len()` cells.
/// With no windows it has no rows; with no enrollments every row is empty.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceMatrix {
    pub windows: Vec<SignatureWindow>,
    pub enrollments: Vec<Enrollment>,
    pub signed: Vec<Vec<bool>>,
}

impl AttendanceMatrix {
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty() || self.enrollments.is_empty()
    }

    pub fn signed_count(&self) -> usize {
        self.signed.iter().flatten().filter(|cell| **cell).count()
    }

    /// Per enrollment column: signed every window that has ever been
    /// opened. A session with no opened window has nobody fully signed.
    pub fn fully_signed(&self) -> Vec<bool> {
        let opened_rows: Vec<&Vec<bool>> = self
            .windows
            .iter()
            .zip(&self.signed)
            .filter(|(window, _)| window.was_ever_opened())
            .map(|(_, row)| row)
            .collect();

        if opened_rows.is_empty() {
            return vec![false; self.enrollments.len()];
        }

        let mut result = vec![true; self.enrollments.len()];
        for row in opened_rows {
            for (col, cell) in row.iter().enumerate() {
                if !cell {
                    result[col] = false;
                }
            }
        }
        result
    }
}

/// Build the matrix from one snapshot of each input.
///
/// Keys that reference a window or enrollment absent from the snapshot are
/// ignored.
pub fn build_matrix(
    windows: Vec<SignatureWindow>,
    enrollments: Vec<Enrollment>,
    keys: &[SignatureKey],
) -> AttendanceMatrix {
    let rows: HashMap<Uuid, usize> = windows
        .iter()
        .enumerate()
        .map(|(i, w)| (w.id, i))
        .collect();
    let cols: HashMap<Uuid, usize> = enrollments
        .iter()
        .enumerate()
        .map(|(j, e)| (e.id, j))
        .collect();

    let mut signed = vec![vec![false; enrollments.len()]; windows.len()];
    for key in keys {
        if let (Some(&i), Some(&j)) = (rows.get(&key.window_id), cols.get(&key.enrollment_id)) {
            signed[i][j] = true;
        }
    }

    AttendanceMatrix {
        windows,
        enrollments,
        signed,
    }
}

/// Enrollments of a window split into signed and missing, each keeping the
/// input order.
#[derive(Debug, Clone, Default)]
pub struct SignaturePartition {
    pub signed: Vec<Enrollment>,
    pub missing: Vec<Enrollment>,
}

pub fn partition_enrollments(
    enrollments: Vec<Enrollment>,
    signed_ids: &HashSet<Uuid>,
) -> SignaturePartition {
    let (signed, missing) = enrollments
        .into_iter()
        .partition(|e| signed_ids.contains(&e.id));
    SignaturePartition { signed, missing }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::window::{Period, WindowStatus};
    use chrono::{NaiveDate, Utc};
    use proptest::prelude::*;

    fn window(session_id: Uuid, day: u32, period: Period, opened: bool) -> SignatureWindow {
        let now = Utc::now();
        SignatureWindow {
            id: Uuid::new_v4(),
            session_id,
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            period,
            status: WindowStatus::Closed,
            opened_at: opened.then_some(now),
            token_hash: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn enrollment(session_id: Uuid) -> Enrollment {
        Enrollment {
            id: Uuid::new_v4(),
            session_id,
            employee_id: Uuid::new_v4(),
            token_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn cells_follow_signature_keys() {
        let sid = Uuid::new_v4();
        let windows = vec![
            window(sid, 1, Period::Morning, true),
            window(sid, 1, Period::Afternoon, true),
        ];
        let enrollments = vec![enrollment(sid), enrollment(sid), enrollment(sid)];
        let keys = vec![
            SignatureKey {
                window_id: windows[0].id,
                enrollment_id: enrollments[2].id,
            },
            SignatureKey {
                window_id: windows[1].id,
                enrollment_id: enrollments[0].id,
            },
        ];

        let m = build_matrix(windows, enrollments, &keys);
        assert_eq!(
            m.signed,
            vec![vec![false, false, true], vec![true, false, false]]
        );
        assert_eq!(m.signed_count(), 2);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let sid = Uuid::new_v4();
        let windows = vec![window(sid, 1, Period::Morning, true)];
        let enrollments = vec![enrollment(sid)];
        let keys = vec![SignatureKey {
            window_id: Uuid::new_v4(),
            enrollment_id: enrollments[0].id,
        }];

        let m = build_matrix(windows, enrollments, &keys);
        assert_eq!(m.signed, vec![vec![false]]);
    }

    #[test]
    fn empty_inputs_give_defined_shapes() {
        let sid = Uuid::new_v4();

        let m = build_matrix(Vec::new(), vec![enrollment(sid)], &[]);
        assert!(m.is_empty());
        assert!(m.signed.is_empty());

        let m = build_matrix(vec![window(sid, 2, Period::Morning, false)], Vec::new(), &[]);
        assert!(m.is_empty());
        assert_eq!(m.signed, vec![Vec::<bool>::new()]);
        assert!(m.fully_signed().is_empty());
    }

    #[test]
    fn fully_signed_ignores_never_opened_windows() {
        let sid = Uuid::new_v4();
        let windows = vec![
            window(sid, 1, Period::Morning, true),
            window(sid, 2, Period::Morning, false),
        ];
        let enrollments = vec![enrollment(sid), enrollment(sid)];
        let keys = vec![SignatureKey {
            window_id: windows[0].id,
            enrollment_id: enrollments[1].id,
        }];

        let m = build_matrix(windows, enrollments, &keys);
        assert_eq!(m.fully_signed(), vec![false, true]);
    }

    #[test]
    fn nobody_fully_signed_before_any_window_opens() {
        let sid = Uuid::new_v4();
        let m = build_matrix(
            vec![window(sid, 1, Period::Morning, false)],
            vec![enrollment(sid)],
            &[],
        );
        assert_eq!(m.fully_signed(), vec![false]);
    }

    proptest! {
        #[test]
        fn matrix_is_always_windows_by_enrollments(
            n_windows in 0usize..6,
            n_enrollments in 0usize..8,
            picks in proptest::collection::vec((0usize..6, 0usize..8), 0..40),
        ) {
            let sid = Uuid::new_v4();
            let windows: Vec<_> = (0..n_windows)
                .map(|i| window(sid, 1 + i as u32, Period::Morning, true))
                .collect();
            let enrollments: Vec<_> = (0..n_enrollments).map(|_| enrollment(sid)).collect();
            let keys: Vec<_> = picks
                .iter()
                .filter(|(w, e)| *w < n_windows && *e < n_enrollments)
                .map(|(w, e)| SignatureKey {
                    window_id: windows[*w].id,
                    enrollment_id: enrollments[*e].id,
                })
                .collect();
            let distinct: HashSet<_> = keys.iter().copied().collect();

            let m = build_matrix(windows, enrollments, &keys);
            prop_assert_eq!(m.signed.len(), n_windows);
            for row in &m.signed {
                prop_assert_eq!(row.len(), n_enrollments);
            }
            prop_assert_eq!(m.signed_count(), distinct.len());
        }

        #[test]
        fn partition_is_exact(
            n_enrollments in 0usize..20,
            signed_mask in proptest::collection::vec(any::<bool>(), 20),
        ) {
            let sid = Uuid::new_v4();
            let enrollments: Vec<_> = (0..n_enrollments).map(|_| enrollment(sid)).collect();
            let all: HashSet<Uuid> = enrollments.iter().map(|e| e.id).collect();
            let signed_ids: HashSet<Uuid> = enrollments
                .iter()
                .zip(&signed_mask)
                .filter(|(_, s)| **s)
                .map(|(e, _)| e.id)
                .collect();

            let p = partition_enrollments(enrollments, &signed_ids);
            let signed: HashSet<Uuid> = p.signed.iter().map(|e| e.id).collect();
            let missing: HashSet<Uuid> = p.missing.iter().map(|e| e.id).collect();

            prop_assert!(signed.is_disjoint(&missing));
            prop_assert_eq!(signed.union(&missing).copied().collect::<HashSet<_>>(), all);
            prop_assert_eq!(signed, signed_ids);
        }
    }
}
