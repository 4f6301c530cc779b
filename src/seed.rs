//! Starter fleets for the dispatch board plus a random flight generator.
//! The binary loads one of these when it starts so the board is never empty.

use rand::Rng;
use tracing::{debug, info};

use crate::dispatcher::Dispatcher;
use crate::models::{DeliveryKey, Drone, Flight, RouteKey, Slot, Train};

const AIRLINES: [&str; 6] = [
    "Iberia",
    "Ryanair",
    "AirEuropa",
    "Vueling",
    "Latam",
    "AmericanAirlines",
];

const CITIES: [&str; 8] = [
    "Madrid",
    "Barcelona",
    "Paris",
    "Londres",
    "Roma",
    "NuevaYork",
    "MexicoDF",
    "BuenosAires",
];

/// Every December departure lands between the 4th and the 30th.
const FIRST_DAY: u32 = 4;
const LAST_DAY: u32 = 31;
const DECEMBER: u32 = 20251200;

fn text(value: &str) -> String {
    value.to_string()
}

pub fn sample_trains() -> Vec<Train> {
    let rows = [
        ("Sevilla", "T100", "Renfe", "Madrid", 530, 20251216, 730, "Contenedores"),
        ("Bilbao", "T220", "Medway", "Zaragoza", 305, 20251216, 1100, "Acero"),
        ("Valencia", "T310", "Renfe", "Madrid", 350, 20251217, 600, "Grano"),
        ("Sevilla", "T045", "Captrain", "Huelva", 95, 20251217, 1530, "Quimicos"),
        ("Barcelona", "T500", "Medway", "Valencia", 350, 20251218, 2200, "Automoviles"),
    ];
    rows.into_iter()
        .map(|(destination, id, company, origin, km, date, time, cargo)| Train {
            route: RouteKey::new(destination, id),
            company: text(company),
            origin: text(origin),
            distance_km: km,
            departure: Slot::new(date, time),
            cargo: text(cargo),
        })
        .collect()
}

pub fn sample_flights() -> Vec<Flight> {
    let rows = [
        ("IB345", "Madrid", "Paris", "Iberia", 20251210, 915),
        ("FR102", "Barcelona", "Londres", "Ryanair", 20251210, 640),
        ("UX770", "Madrid", "BuenosAires", "AirEuropa", 20251211, 2350),
        ("VY811", "Roma", "Barcelona", "Vueling", 20251209, 1805),
    ];
    rows.into_iter()
        .map(|(code, origin, destination, airline, date, time)| Flight {
            code: text(code),
            origin: text(origin),
            destination: text(destination),
            airline: text(airline),
            departure: Slot::new(date, time),
        })
        .collect()
}

pub fn sample_drones() -> Vec<Drone> {
    let rows = [
        ("D1", "Com1", "ZonaA", "A1", 90, 20251216, 1400, "Paquete"),
        ("D2", "Com2", "ZonaB", "B1", 50, 20251216, 1500, "Carta"),
        ("D3", "Com1", "ZonaC", "C1", 75, 20251217, 1000, "Paquete"),
    ];
    rows.into_iter()
        .map(|(id, company, origin, zone, battery, date, time, cargo)| Drone {
            delivery: DeliveryKey::new(zone, id),
            company: text(company),
            origin_zone: text(origin),
            battery_pct: battery,
            mission: Slot::new(date, time),
            cargo: text(cargo),
        })
        .collect()
}

/// A random flight with a code like `AB123`, two different cities and a
/// December slot.
pub fn random_flight<R: Rng + ?Sized>(rng: &mut R) -> Flight {
    let letters: String = (0..2)
        .map(|_| char::from(b'A' + rng.random_range(0..26u8)))
        .collect();
    let code = format!("{letters}{:03}", rng.random_range(0..1000u32));

    let origin = rng.random_range(0..CITIES.len());
    let mut destination = rng.random_range(0..CITIES.len() - 1);
    if destination >= origin {
        destination += 1;
    }

    let date = DECEMBER + rng.random_range(FIRST_DAY..LAST_DAY);
    let time = rng.random_range(0..24u16) * 100 + rng.random_range(0..60u16);

    Flight {
        code,
        origin: text(CITIES[origin]),
        destination: text(CITIES[destination]),
        airline: text(AIRLINES[rng.random_range(0..AIRLINES.len())]),
        departure: Slot::new(date, time),
    }
}

/// Register up to `n` random flights and schedule each one at its departure
/// slot. Colliding codes are redrawn; after `5 * n` draws the generator gives
/// up. Returns how many flights made it in.
pub fn generate_flights<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    dispatcher: &mut Dispatcher<Flight>,
) -> usize {
    let max_attempts = n.saturating_mul(5);
    let mut registered = 0;
    let mut attempts = 0;

    while registered < n && attempts < max_attempts {
        attempts += 1;
        let flight = random_flight(rng);
        let code = flight.code.clone();
        let slot = flight.departure.priority();
        match dispatcher.register(flight) {
            Ok(_) => {}
            Err(duplicate) => {
                debug!(code = duplicate.key(), "generated code already taken");
                continue;
            }
        }
        if let Err(err) = dispatcher.schedule_at(code.as_str(), slot) {
            debug!(%code, error = %err, "generated flight left unscheduled");
        }
        registered += 1;
    }

    info!(requested = n, registered, attempts, "generated random flights");
    registered
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::entity::Entity;

    #[test]
    fn test_fixtures_have_unique_keys() {
        let mut trains = Dispatcher::<Train>::default();
        for train in sample_trains() {
            trains.register(train).unwrap();
        }
        let mut drones = Dispatcher::<Drone>::default();
        for drone in sample_drones() {
            drones.register(drone).unwrap();
        }
        assert_eq!(trains.registry().len(), 5);
        assert_eq!(drones.registry().len(), 3);
    }

    #[test]
    fn test_drone_fixture_matches_known_fleet() {
        let drones = sample_drones();
        let d1 = &drones[0];
        assert_eq!(d1.key(), &DeliveryKey::new("A1", "D1"));
        assert_eq!(d1.battery_pct, 90);
        assert_eq!(d1.mission.priority(), 202512161400);
    }

    #[test]
    fn test_random_flights_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let flight = random_flight(&mut rng);
            assert_eq!(flight.code.len(), 5);
            assert!(flight.code[..2].chars().all(|c| c.is_ascii_uppercase()));
            assert!(flight.code[2..].chars().all(|c| c.is_ascii_digit()));
            assert_ne!(flight.origin, flight.destination);
            assert!((20251204..=20251230).contains(&flight.departure.date));
            assert!(flight.departure.time % 100 < 60);
            assert!(flight.departure.time / 100 < 24);
        }
    }

    #[test]
    fn test_generated_flights_are_registered_and_scheduled() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut desk = Dispatcher::<Flight>::default();
        let made = generate_flights(&mut rng, 25, &mut desk);

        assert_eq!(made, desk.registry().len());
        assert_eq!(made, desk.queue().len());
        assert!(made > 0 && made <= 25);

        let slots: Vec<_> = desk.plan().map(|s| s.priority).collect();
        assert!(slots.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_generating_zero_flights_draws_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut desk = Dispatcher::<Flight>::default();
        assert_eq!(generate_flights(&mut rng, 0, &mut desk), 0);
        assert!(desk.registry().is_empty());
    }
}
