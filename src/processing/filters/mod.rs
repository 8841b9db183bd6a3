pub mod bandpass;
pub mod biquad;
pub mod chain;
pub mod low_pass;
pub mod notch;

pub use chain::FilterChain;

/// One stateful stage of the filter chain.
pub trait FilterStage: Send {
    fn name(&self) -> &'static str;

    /// Filters one valid sample, updating the stage history.
    fn process(&mut self, input: f64) -> f64;

    /// Sets the history to the steady state for a constant `input`.
    fn prime(&mut self, input: f64);
}

/// Pulls a filtered value back toward the unfiltered one by `raw_weight`.
pub fn blend_toward_raw(filtered: f64, raw: f64, raw_weight: f64) -> f64 {
    (1.0 - raw_weight) * filtered + raw_weight * raw
}
