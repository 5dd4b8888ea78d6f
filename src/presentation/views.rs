//! HTML views.
//!
//! Every function renders a complete fragment from the current store state;
//! there is no diffing. Values are formatted here so the templates stay dumb,
//! and askama escapes everything interpolated into them.

use crate::{
    config::DisplayConfig,
    core::store::DataStore,
    entities::Vehicle,
    errors::Result,
};
use askama::Template;

/// Shown instead of the odometer reading when none was recorded.
pub const MILEAGE_FALLBACK: &str = "Mileage not specified";
/// Shown instead of the daily rate when none was recorded.
pub const RATE_FALLBACK: &str = "Rate not set";

#[derive(Template)]
#[template(path = "main_app.html")]
struct MainAppView<'a> {
    vehicle_count: usize,
    booking_count: usize,
    transaction_count: usize,
    grid: &'a str,
}

#[derive(Template)]
#[template(path = "vehicle_grid.html")]
struct VehicleGridView {
    cards: Vec<VehicleCard>,
}

#[derive(Template)]
#[template(path = "signed_out.html")]
struct SignedOutView;

/// Display-ready values for one vehicle card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleCard {
    /// Make and model
    pub title: String,
    /// Licence plate
    pub plate: String,
    /// Model year, empty when unknown
    pub year: String,
    /// Mileage with unit, or [`MILEAGE_FALLBACK`]
    pub mileage: String,
    /// Daily rate with currency, or [`RATE_FALLBACK`]
    pub rate: String,
}

impl VehicleCard {
    /// Formats `vehicle` for display.
    #[must_use]
    pub fn new(vehicle: &Vehicle, display: &DisplayConfig) -> Self {
        let sep = display.thousands_separator.as_str();
        let mileage = match vehicle.mileage {
            Some(km) if km.is_finite() && km > 0.0 => {
                format!("{} {}", format_amount(km, sep), display.distance_unit)
            }
            _ => MILEAGE_FALLBACK.to_string(),
        };
        let rate = vehicle.price1.filter(|p| p.is_finite()).map_or_else(
            || RATE_FALLBACK.to_string(),
            |price| format!("{} {}/day", format_amount(price, sep), display.currency),
        );

        Self {
            title: format!("{} {}", vehicle.make, vehicle.model).trim().to_string(),
            plate: vehicle.plate.clone(),
            year: vehicle.year.map(|y| y.to_string()).unwrap_or_default(),
            mileage,
            rate,
        }
    }
}

/// Main view and cars grid HTML, rendered together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainView {
    /// Content for `main-content` (with the grid embedded)
    pub main_content: String,
    /// Content for `cars-grid`
    pub cars_grid: String,
}

/// Renders the cards for `vehicles`, or the empty-fleet prompt.
pub fn render_vehicle_grid(vehicles: &[Vehicle], display: &DisplayConfig) -> Result<String> {
    let cards = vehicles
        .iter()
        .map(|vehicle| VehicleCard::new(vehicle, display))
        .collect();
    Ok(VehicleGridView { cards }.render()?)
}

/// Renders the main application view: the vehicle grid plus collection counts.
pub fn render_main_app(store: &DataStore, display: &DisplayConfig) -> Result<MainView> {
    let cars_grid = render_vehicle_grid(store.vehicles().as_slice(), display)?;
    let main_content = MainAppView {
        vehicle_count: store.vehicles().len(),
        booking_count: store.bookings().len(),
        transaction_count: store.transactions().len(),
        grid: &cars_grid,
    }
    .render()?;
    Ok(MainView {
        main_content,
        cars_grid,
    })
}

/// Renders the post-logout view offering to sign in again.
pub fn render_signed_out() -> Result<String> {
    Ok(SignedOutView.render()?)
}

/// `12345` -> `12 345` with `sep = " "`.
#[must_use]
pub fn group_digits(value: u64, sep: &str) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * sep.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push_str(sep);
        }
        out.push(ch);
    }
    out
}

/// Groups the integer part and keeps up to two decimals, dropping trailing zeros.
#[must_use]
pub fn format_amount(value: f64, sep: &str) -> String {
    let cents = (value.abs() * 100.0).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let cents = cents as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    let whole = group_digits(cents / 100, sep);
    match cents % 100 {
        0 => format!("{sign}{whole}"),
        frac if frac % 10 == 0 => format!("{sign}{whole}.{}", frac / 10),
        frac => format!("{sign}{whole}.{frac:02}"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{MemoryBackend, test_user};
    use serde_json::json;

    fn camry() -> Vehicle {
        Vehicle {
            id: Some("v1".to_string()),
            plate: "A123BC".to_string(),
            year: Some(2020),
            mileage: Some(45_000.0),
            price1: Some(2000.0),
            ..Vehicle::new("Toyota", "Camry")
        }
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits(0, " "), "0");
        assert_eq!(group_digits(999, " "), "999");
        assert_eq!(group_digits(1000, " "), "1 000");
        assert_eq!(group_digits(1_234_567, ","), "1,234,567");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(2000.0, " "), "2 000");
        assert_eq!(format_amount(1500.5, " "), "1 500.5");
        assert_eq!(format_amount(-12.34, ","), "-12.34");
        assert_eq!(format_amount(0.001, ","), "0");
    }

    #[test]
    fn test_card_formats_values() {
        let card = VehicleCard::new(&camry(), &DisplayConfig::default());
        assert_eq!(card.title, "Toyota Camry");
        assert_eq!(card.year, "2020");
        assert_eq!(card.mileage, "45 000 km");
        assert_eq!(card.rate, "2 000 ₽/day");
    }

    #[test]
    fn test_card_uses_explicit_fallbacks() {
        let card = VehicleCard::new(&Vehicle::new("Kia", "Rio"), &DisplayConfig::default());
        assert_eq!(card.mileage, MILEAGE_FALLBACK);
        assert_eq!(card.rate, RATE_FALLBACK);
        assert!(card.year.is_empty());

        let mut negative = camry();
        negative.mileage = Some(-5.0);
        let card = VehicleCard::new(&negative, &DisplayConfig::default());
        assert_eq!(card.mileage, MILEAGE_FALLBACK);
    }

    #[test]
    fn test_card_keeps_fractional_mileage() {
        let mut vehicle = camry();
        vehicle.mileage = Some(45_000.5);
        let card = VehicleCard::new(&vehicle, &DisplayConfig::default());
        assert_eq!(card.mileage, "45 000.5 km");
    }

    #[test]
    fn test_grid_renders_cards_and_escapes() {
        let mut vehicle = camry();
        vehicle.model = "<script>alert(1)</script>".to_string();

        let html = render_vehicle_grid(&[vehicle], &DisplayConfig::default()).unwrap();
        assert!(html.contains("Toyota"));
        assert!(html.contains("A123BC"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("No vehicles yet"));
    }

    #[test]
    fn test_empty_grid_shows_prompt() {
        let html = render_vehicle_grid(&[], &DisplayConfig::default()).unwrap();
        assert!(html.contains("No vehicles yet"));
        assert!(html.contains("Add first vehicle"));
    }

    #[tokio::test]
    async fn test_main_view_counts_collections() -> Result<()> {
        let backend = MemoryBackend::new();
        backend.seed(
            "bookings",
            vec![
                json!({"id": "b1", "user_id": "u1", "start_date": "2024-01-10", "end_date": "2024-01-12"}),
                json!({"id": "b2", "user_id": "u1", "start_date": "2024-02-10", "end_date": "2024-02-12"}),
            ],
        );
        let mut store = DataStore::default();
        store.sign_in(test_user("u1", "a@b.com"));
        store.load_all(&backend, "u1").await?;
        store
            .save_vehicle(&backend, Vehicle::new("Toyota", "Camry"))
            .await?;

        let view = render_main_app(&store, &DisplayConfig::default())?;
        assert!(view.main_content.contains(r#"id="cars-grid""#));
        assert!(view.main_content.contains(">1</div>"));
        assert!(view.main_content.contains(">2</div>"));
        assert!(view.main_content.contains(">0</div>"));
        assert!(view.main_content.contains("Toyota Camry"));
        assert!(view.cars_grid.contains("Toyota Camry"));
        Ok(())
    }

    #[test]
    fn test_signed_out_view() {
        let html = render_signed_out().unwrap();
        assert!(html.contains("You have signed out"));
        assert!(html.contains("Sign in again"));
    }
}
