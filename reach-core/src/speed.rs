//! Weather and slope adjustments applied to the user's base speed.

use crate::model::{EffectiveTravel, TravelMode, WeatherObservation};

/// Slowest the weather can make anyone: 30% of normal speed.
pub const MIN_SPEED_MULTIPLIER: f64 = 0.3;

pub fn adjust(
    base_speed_kmh: f64,
    duration_minutes: f64,
    mode: TravelMode,
    weather: Option<&WeatherObservation>,
) -> EffectiveTravel {
    let speed_multiplier = weather.map_or(1.0, |w| weather_multiplier(w, mode));

    EffectiveTravel {
        effective_speed_kmh: base_speed_kmh * speed_multiplier,
        adjusted_duration_minutes: duration_minutes,
        speed_multiplier,
    }
}

/// Combined slowdown factor for the given conditions, in `[0.3, 1.0]`.
///
/// All penalties are summed before clamping, so the order of the rules does
/// not matter.
pub fn weather_multiplier(weather: &WeatherObservation, mode: TravelMode) -> f64 {
    let mut penalty = 0.0;

    let temperature = weather.temperature_c;
    if temperature < 0.0 {
        penalty += 0.1;
        if temperature < -10.0 {
            penalty += 0.1;
        }
    } else if temperature > 30.0 {
        penalty += 0.1;
        if temperature > 35.0 {
            penalty += 0.1;
        }
    }

    let wind = weather.wind_speed_kmh;
    if wind > 5.0 {
        let wind_penalty = ((wind - 5.0) * 0.03).min(0.3);
        penalty += match mode {
            TravelMode::Biking => wind_penalty * 1.5,
            _ => wind_penalty,
        };
    }

    let precipitation = weather.precipitation_mm;
    if precipitation > 0.0 {
        penalty += (precipitation * 0.1).min(0.3);
        if mode != TravelMode::Driving {
            penalty += (precipitation * 0.05).min(0.2);
        }
    }

    let snowfall = weather.snowfall_mm;
    if snowfall > 0.0 {
        penalty += (snowfall * 0.2).min(0.4);
        if mode == TravelMode::Driving {
            penalty += (snowfall * 0.1).min(0.3);
        }
    }

    // f64::max swallows a NaN left operand
    (1.0 - penalty).max(MIN_SPEED_MULTIPLIER).min(1.0)
}

/// Short German summary used in tooltips, e.g. `-2°C, Schneefall (1.5 mm), Wind: 12 km/h`.
pub fn describe_weather(weather: &WeatherObservation) -> String {
    let mut description = format!("{}°C", weather.temperature_c);

    if weather.snowfall_mm > 0.0 {
        description.push_str(&format!(", Schneefall ({} mm)", weather.snowfall_mm));
    } else if weather.precipitation_mm > 0.0 {
        description.push_str(&format!(", Niederschlag ({} mm)", weather.precipitation_mm));
    }

    if weather.wind_speed_kmh > 0.0 {
        description.push_str(&format!(", Wind: {} km/h", weather.wind_speed_kmh));
    }

    description
}

/// Uphill costs 5% per degree (down to 20% of base speed); downhill gains
/// 2% per degree, capped at +20%.
pub fn adjust_speed_for_slope(base_speed_kmh: f64, slope_degrees: f64) -> f64 {
    if slope_degrees > 0.0 {
        base_speed_kmh * (1.0 - slope_degrees * 0.05).max(0.2)
    } else {
        base_speed_kmh * (1.0 + slope_degrees.abs() * 0.02).min(1.2)
    }
}
