//! Domain records for the three fleets the dispatch desk manages. They stay
//! plain data holders: ordering lives in the registry, urgency in the queue,
//! and each type only says which field is its key and which is its priority.

use std::cmp::Ordering;
use std::fmt;

use crate::entity::{Entity, Order, Priority};

/// A calendar slot stored the way operators type it: `YYYYMMDD` and `HHMM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Slot {
    pub date: u32,
    pub time: u16,
}

impl Slot {
    pub fn new(date: u32, time: u16) -> Self {
        Self { date, time }
    }

    /// Fold the slot into one sortable integer, `YYYYMMDDHHMM`.
    pub fn priority(&self) -> Priority {
        Priority::from(self.date) * 10_000 + Priority::from(self.time)
    }

    /// Inverse of [`Slot::priority`]. Values that do not fit a slot come back
    /// as `None`.
    pub fn from_priority(priority: Priority) -> Option<Self> {
        if priority < 0 {
            return None;
        }
        let date = u32::try_from(priority / 10_000).ok()?;
        let time = u16::try_from(priority % 10_000).ok()?;
        Some(Self { date, time })
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}",
            self.date / 10_000,
            (self.date / 100) % 100,
            self.date % 100,
            self.time / 100,
            self.time % 100
        )
    }
}

/// Trains are ordered by destination first; the train id only separates
/// trains heading to the same place.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteKey {
    pub destination: String,
    pub train_id: String,
}

impl RouteKey {
    pub fn new(destination: impl Into<String>, train_id: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            train_id: train_id.into(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.destination, self.train_id)
    }
}

/// Logistics train. Longer hauls are dispatched first.
#[derive(Debug, Clone, PartialEq)]
pub struct Train {
    pub route: RouteKey,
    pub company: String,
    pub origin: String,
    pub distance_km: i64,
    pub departure: Slot,
    pub cargo: String,
}

impl Train {
    /// Filter: trains carrying exactly `cargo`.
    pub fn carrying(cargo: &str) -> impl Fn(&Train) -> bool + '_ {
        move |train| train.cargo == cargo
    }

    /// Filter: trains covering at least `km` kilometres.
    pub fn min_distance(km: i64) -> impl Fn(&Train) -> bool {
        move |train| train.distance_km >= km
    }

    /// Band locator for every train heading to `destination`.
    pub fn bound_for(destination: &str) -> impl FnMut(&RouteKey) -> Ordering + '_ {
        move |key| key.destination.as_str().cmp(destination)
    }
}

impl Entity for Train {
    type Key = RouteKey;
    const KIND: &'static str = "train";

    fn key(&self) -> &RouteKey {
        &self.route
    }

    fn key_mut(&mut self) -> &mut RouteKey {
        &mut self.route
    }

    fn priority(&self) -> Priority {
        self.distance_km
    }

    fn default_order() -> Order {
        Order::Max
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Company", self.company.clone()),
            ("Origin", self.origin.clone()),
            ("Distance", format!("{} km", self.distance_km)),
            ("Departure", self.departure.to_string()),
            ("Cargo", self.cargo.clone()),
        ]
    }
}

impl fmt::Display for Train {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} ({} km, {})",
            self.route.train_id, self.origin, self.route.destination, self.distance_km, self.cargo
        )
    }
}

/// Scheduled flight, keyed by its code. Earlier departures leave first.
#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    pub code: String,
    pub origin: String,
    pub destination: String,
    pub airline: String,
    pub departure: Slot,
}

impl Flight {
    /// Filter: flights landing in `destination`.
    pub fn bound_for(destination: &str) -> impl Fn(&Flight) -> bool + '_ {
        move |flight| flight.destination == destination
    }

    /// Filter: flights flown by `airline`.
    pub fn operated_by(airline: &str) -> impl Fn(&Flight) -> bool + '_ {
        move |flight| flight.airline == airline
    }
}

impl Entity for Flight {
    type Key = String;
    const KIND: &'static str = "flight";

    fn key(&self) -> &String {
        &self.code
    }

    fn key_mut(&mut self) -> &mut String {
        &mut self.code
    }

    fn priority(&self) -> Priority {
        self.departure.priority()
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Airline", self.airline.clone()),
            ("Origin", self.origin.clone()),
            ("Destination", self.destination.clone()),
            ("Departure", self.departure.to_string()),
        ]
    }
}

impl fmt::Display for Flight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} -> {} at {}",
            self.code, self.airline, self.origin, self.destination, self.departure
        )
    }
}

/// Drones are ordered by delivery zone, then by drone id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeliveryKey {
    pub zone: String,
    pub drone_id: String,
}

impl DeliveryKey {
    pub fn new(zone: impl Into<String>, drone_id: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            drone_id: drone_id.into(),
        }
    }
}

impl fmt::Display for DeliveryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.zone, self.drone_id)
    }
}

/// Delivery drone. The best-charged drone flies the next mission.
#[derive(Debug, Clone, PartialEq)]
pub struct Drone {
    pub delivery: DeliveryKey,
    pub company: String,
    pub origin_zone: String,
    pub battery_pct: u8,
    pub mission: Slot,
    pub cargo: String,
}

impl Drone {
    pub fn carrying(cargo: &str) -> impl Fn(&Drone) -> bool + '_ {
        move |drone| drone.cargo == cargo
    }

    pub fn battery_at_least(pct: u8) -> impl Fn(&Drone) -> bool {
        move |drone| drone.battery_pct >= pct
    }

    /// Band locator for every drone delivering to `zone`.
    pub fn in_zone(zone: &str) -> impl FnMut(&DeliveryKey) -> Ordering + '_ {
        move |key| key.zone.as_str().cmp(zone)
    }
}

impl Entity for Drone {
    type Key = DeliveryKey;
    const KIND: &'static str = "drone";

    fn key(&self) -> &DeliveryKey {
        &self.delivery
    }

    fn key_mut(&mut self) -> &mut DeliveryKey {
        &mut self.delivery
    }

    fn priority(&self) -> Priority {
        Priority::from(self.battery_pct)
    }

    fn default_order() -> Order {
        Order::Max
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Company", self.company.clone()),
            ("Origin", self.origin_zone.clone()),
            ("Battery", format!("{}%", self.battery_pct)),
            ("Mission", self.mission.to_string()),
            ("Cargo", self.cargo.clone()),
        ]
    }
}

impl fmt::Display for Drone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {} ({}%, {})",
            self.delivery.drone_id, self.delivery.zone, self.battery_pct, self.cargo
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_folds_date_and_time() {
        let slot = Slot::new(20251216, 1405);
        assert_eq!(slot.priority(), 202512161405);
        assert_eq!(Slot::from_priority(202512161405), Some(slot));
        assert_eq!(slot.to_string(), "2025-12-16 14:05");
        assert!(Slot::from_priority(-1).is_none());
    }

    #[test]
    fn test_earlier_slots_have_lower_priority() {
        let morning = Slot::new(20251216, 900);
        let evening = Slot::new(20251216, 2130);
        let next_day = Slot::new(20251217, 0);
        assert!(morning.priority() < evening.priority());
        assert!(evening.priority() < next_day.priority());
    }

    #[test]
    fn test_route_keys_order_by_destination_then_id() {
        let mut keys = vec![
            RouteKey::new("Sevilla", "T2"),
            RouteKey::new("Bilbao", "T9"),
            RouteKey::new("Sevilla", "T1"),
        ];
        keys.sort();
        let labels: Vec<_> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(labels, ["Bilbao/T9", "Sevilla/T1", "Sevilla/T2"]);
    }

    #[test]
    fn test_default_orders_follow_each_fleet() {
        assert_eq!(Train::default_order(), Order::Max);
        assert_eq!(Flight::default_order(), Order::Min);
        assert_eq!(Drone::default_order(), Order::Max);
    }

    #[test]
    fn test_text_match_covers_key_and_payload() {
        let drone = Drone {
            delivery: DeliveryKey::new("A1", "D1"),
            company: "Com1".to_string(),
            origin_zone: "ZonaA".to_string(),
            battery_pct: 90,
            mission: Slot::new(20251216, 1400),
            cargo: "Paquete".to_string(),
        };
        assert!(drone.matches_text("a1/d1"));
        assert!(drone.matches_text("paq"));
        assert!(drone.matches_text(""));
        assert!(!drone.matches_text("carta"));
        assert!(Drone::battery_at_least(90)(&drone));
        assert!(!Drone::carrying("Carta")(&drone));
    }
}
