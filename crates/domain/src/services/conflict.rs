//! Booking conflict detection over an already-fetched set of reservations.

use uuid::Uuid;

use crate::models::date_range::{BoundaryPolicy, DateRange};
use crate::models::reservation::Reservation;

/// A proposed booking of one vehicle.
#[derive(Debug, Clone, Copy)]
pub struct BookingCandidate {
    pub vehicle_id: Uuid,
    pub range: DateRange,
    /// The reservation being edited, if any.
    pub exclude_id: Option<Uuid>,
}

/// Returns the reservations that would collide with `candidate`.
///
/// Reservations for other vehicles, the excluded reservation, and cancelled
/// reservations are ignored.
pub fn find_conflicts<'a>(
    candidate: &BookingCandidate,
    existing: &'a [Reservation],
    policy: BoundaryPolicy,
) -> Vec<&'a Reservation> {
    existing
        .iter()
        .filter(|r| r.vehicle_id == candidate.vehicle_id)
        .filter(|r| Some(r.id) != candidate.exclude_id)
        .filter(|r| r.blocks_calendar())
        .filter(|r| r.range().overlaps(&candidate.range, policy))
        .collect()
}

/// Whether `candidate` can be booked without conflicts.
pub fn is_available(
    candidate: &BookingCandidate,
    existing: &[Reservation],
    policy: BoundaryPolicy,
) -> bool {
    find_conflicts(candidate, existing, policy).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::reservation::ReservationStatus;
    use chrono::{NaiveDate, Utc};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn booking(vehicle_id: Uuid, start: &str, end: Option<&str>) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            vehicle_id,
            customer_id: Uuid::new_v4(),
            driver_id: None,
            start_date: d(start),
            end_date: end.map(d),
            status: ReservationStatus::Confirmed,
            total_amount: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn candidate(vehicle_id: Uuid, start: &str, end: &str) -> BookingCandidate {
        BookingCandidate {
            vehicle_id,
            range: DateRange::new(d(start), d(end)).unwrap(),
            exclude_id: None,
        }
    }

    #[test]
    fn test_detects_overlap_for_same_vehicle() {
        let car = Uuid::new_v4();
        let existing = vec![booking(car, "2024-01-01", Some("2024-01-05"))];
        let c = candidate(car, "2024-01-05", "2024-01-10");
        let conflicts = find_conflicts(&c, &existing, BoundaryPolicy::Inclusive);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, existing[0].id);
    }

    #[test]
    fn test_ignores_other_vehicles() {
        let car = Uuid::new_v4();
        let existing = vec![booking(Uuid::new_v4(), "2024-01-01", Some("2024-01-05"))];
        let c = candidate(car, "2024-01-01", "2024-01-05");
        assert!(is_available(&c, &existing, BoundaryPolicy::Inclusive));
    }

    #[test]
    fn test_excludes_reservation_being_edited() {
        let car = Uuid::new_v4();
        let existing = vec![booking(car, "2024-01-01", Some("2024-01-05"))];
        let mut c = candidate(car, "2024-01-02", "2024-01-06");
        assert!(!is_available(&c, &existing, BoundaryPolicy::Inclusive));
        c.exclude_id = Some(existing[0].id);
        assert!(is_available(&c, &existing, BoundaryPolicy::Inclusive));
    }

    #[test]
    fn test_cancelled_reservations_do_not_conflict() {
        let car = Uuid::new_v4();
        let mut cancelled = booking(car, "2024-01-01", Some("2024-01-05"));
        cancelled.status = ReservationStatus::Cancelled;
        let c = candidate(car, "2024-01-03", "2024-01-04");
        assert!(is_available(&c, &[cancelled], BoundaryPolicy::Inclusive));
    }

    #[test]
    fn test_open_ended_reservation_occupies_start_day() {
        let car = Uuid::new_v4();
        let existing = vec![booking(car, "2024-01-07", None)];
        assert!(!is_available(
            &candidate(car, "2024-01-05", "2024-01-07"),
            &existing,
            BoundaryPolicy::Inclusive
        ));
        assert!(is_available(
            &candidate(car, "2024-01-08", "2024-01-09"),
            &existing,
            BoundaryPolicy::Inclusive
        ));
    }

    #[test]
    fn test_turnover_policy_allows_handover_day() {
        let car = Uuid::new_v4();
        let existing = vec![booking(car, "2024-01-01", Some("2024-01-05"))];
        let c = candidate(car, "2024-01-05", "2024-01-10");
        assert!(is_available(&c, &existing, BoundaryPolicy::SameDayTurnover));
    }

    #[test]
    fn test_returns_every_conflict() {
        let car = Uuid::new_v4();
        let existing = vec![
            booking(car, "2024-01-01", Some("2024-01-03")),
            booking(car, "2024-01-08", Some("2024-01-09")),
            booking(car, "2024-01-20", Some("2024-01-25")),
        ];
        let c = candidate(car, "2024-01-02", "2024-01-10");
        assert_eq!(
            find_conflicts(&c, &existing, BoundaryPolicy::Inclusive).len(),
            2
        );
    }
}
