use serde::Serialize;
use tracing::debug;

use crate::geo::distance_km;
use crate::models::driver::Driver;
use crate::models::order::Order;

pub const DEFAULT_RADIUS_KM: f64 = 20.0;

#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub driver: Driver,
    pub distance_km: f64,
}

/// Available drivers within `radius_km` of the order's destination, nearest first.
///
/// An order without a usable destination has no candidates. Drivers with no
/// usable location are skipped. Equal distances keep their input order.
pub fn find_candidates(order: &Order, drivers: &[Driver], radius_km: f64) -> Vec<Candidate> {
    let Some(destination) = order.destination.as_ref() else {
        return Vec::new();
    };
    if let Err(err) = destination.validate() {
        debug!(order_id = %order.id, error = %err, "order destination unusable");
        return Vec::new();
    }

    let mut candidates: Vec<Candidate> = drivers
        .iter()
        .filter(|driver| driver.is_available())
        .filter_map(|driver| {
            match distance_km(driver.location.as_ref(), Some(destination)) {
                Ok(distance) if distance <= radius_km => Some(Candidate {
                    driver: driver.clone(),
                    distance_km: distance,
                }),
                Ok(_) => None,
                Err(err) => {
                    debug!(driver_id = %driver.id, error = %err, "driver location unusable");
                    None
                }
            }
        })
        .collect();

    candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    candidates
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{find_candidates, DEFAULT_RADIUS_KM};
    use crate::geo::{distance_km, GeoPoint};
    use crate::models::driver::{Driver, DriverStatus};
    use crate::models::order::{Order, PaymentMethod};

    fn driver(name: &str, location: Option<GeoPoint>, status: DriverStatus) -> Driver {
        let mut driver = Driver::new(Uuid::new_v4(), name, location);
        driver.status = status;
        driver
    }

    fn order_at(lat: f64, lng: f64) -> Order {
        Order::new(
            Uuid::new_v4(),
            Some(GeoPoint::new(lat, lng)),
            None,
            PaymentMethod::Cash,
        )
    }

    #[test]
    fn johannesburg_scenario_selects_only_nearby_available_driver() {
        let order = order_at(-26.20, 28.05);
        let d1 = driver("D1", Some(GeoPoint::new(-26.21, 28.06)), DriverStatus::Available);
        let d2 = driver("D2", Some(GeoPoint::new(-26.50, 28.50)), DriverStatus::Available);
        let d3 = driver("D3", Some(GeoPoint::new(-26.20, 28.05)), DriverStatus::Busy);

        let candidates = find_candidates(&order, &[d2, d3, d1.clone()], DEFAULT_RADIUS_KM);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].driver.id, d1.id);
    }

    #[test]
    fn candidates_are_ordered_nearest_first() {
        let order = order_at(-26.20, 28.05);
        let far = driver("far", Some(GeoPoint::new(-26.30, 28.15)), DriverStatus::Available);
        let near = driver("near", Some(GeoPoint::new(-26.201, 28.051)), DriverStatus::Available);
        let mid = driver("mid", Some(GeoPoint::new(-26.25, 28.10)), DriverStatus::Available);

        let candidates = find_candidates(
            &order,
            &[far.clone(), near.clone(), mid.clone()],
            DEFAULT_RADIUS_KM,
        );

        let ids: Vec<_> = candidates.iter().map(|c| c.driver.id).collect();
        assert_eq!(ids, vec![near.id, mid.id, far.id]);
        assert!(candidates.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[test]
    fn driver_exactly_on_radius_is_included() {
        let order = order_at(-26.20, 28.05);
        let edge = driver("edge", Some(GeoPoint::new(-26.30, 28.15)), DriverStatus::Available);
        let radius = distance_km(edge.location.as_ref(), order.destination.as_ref()).unwrap();

        let included = find_candidates(&order, &[edge.clone()], radius);
        assert_eq!(included.len(), 1);

        let excluded = find_candidates(&order, &[edge], radius - 0.01);
        assert!(excluded.is_empty());
    }

    #[test]
    fn order_without_destination_has_no_candidates() {
        let mut order = order_at(-26.20, 28.05);
        order.destination = None;
        let d1 = driver("D1", Some(GeoPoint::new(-26.20, 28.05)), DriverStatus::Available);

        assert!(find_candidates(&order, &[d1], DEFAULT_RADIUS_KM).is_empty());
    }

    #[test]
    fn drivers_without_usable_location_are_skipped() {
        let order = order_at(-26.20, 28.05);
        let missing = driver("missing", None, DriverStatus::Available);
        let broken = driver("broken", Some(GeoPoint::new(120.0, 28.05)), DriverStatus::Available);
        let offline = driver("offline", Some(GeoPoint::new(-26.20, 28.05)), DriverStatus::Offline);

        assert!(find_candidates(&order, &[missing, broken, offline], DEFAULT_RADIUS_KM).is_empty());
    }
}
