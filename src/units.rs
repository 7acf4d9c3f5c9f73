//! Unit conversions applied to raw sensor values

/// Integer Fahrenheit as reported by the environment sensor to Celsius
pub fn fahrenheit_to_celsius(fahrenheit: i32) -> f32 {
    (fahrenheit as f32 - 32.0) / 1.8
}

/// Celsius to integer Fahrenheit, truncated the way the DHT11 driver reports it
pub fn celsius_to_fahrenheit_trunc(celsius: i32) -> i32 {
    (celsius as f32 * 1.8 + 32.0) as i32
}

/// Analog fraction of full scale to percent
pub fn fraction_to_percent(fraction: f32) -> f32 {
    fraction * 100.0
}
