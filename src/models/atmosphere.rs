use std::any::Any;

use nalgebra::Vector3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::models::Model;
use crate::state::SimState;
use crate::utils::constants::{
    AIR_GAS_CONSTANT, INHG_TO_PSF, SL_PRESSURE_PSF, SL_TEMPERATURE_R, SPECIFIC_HEAT_RATIO,
    STANDARD_GRAVITY, SUTHERLAND_CONSTANT_R, VISCOSITY_BETA,
};
use crate::utils::errors::SimError;
use crate::utils::math::celsius_to_rankine;
use crate::utils::rng::RngManager;

/// Altitude -> temperature/pressure curves. The standard atmosphere is the
/// default; an embedder may plug its own.
pub trait AtmosphereCurves: Send + Sync {
    /// [Rankine]
    fn temperature(&self, altitude: f64) -> f64;
    /// [lbf/ft^2]
    fn pressure(&self, altitude: f64) -> f64;
}

/// US Standard Atmosphere 1976, English units, up to 278,386 ft.
pub struct StandardAtmosphere {
    // (base geopotential altitude ft, base temperature R, lapse R/ft, base pressure psf)
    layers: Vec<(f64, f64, f64, f64)>,
}

impl StandardAtmosphere {
    pub fn new() -> Self {
        let bases: [(f64, f64, f64); 7] = [
            (0.0, 518.67, -3.56616e-3),
            (36_089.24, 389.97, 0.0),
            (65_616.80, 389.97, 5.4864e-4),
            (104_986.87, 411.57, 1.53619e-3),
            (154_199.48, 487.17, 0.0),
            (167_322.83, 487.17, -1.53619e-3),
            (232_939.63, 386.37, -1.09728e-3),
        ];
        let mut layers = Vec::with_capacity(bases.len());
        let mut pressure = SL_PRESSURE_PSF;
        for (i, &(base_alt, base_temp, lapse)) in bases.iter().enumerate() {
            layers.push((base_alt, base_temp, lapse, pressure));
            if i + 1 < bases.len() {
                let next_alt = bases[i + 1].0;
                pressure = Self::pressure_in_layer(
                    next_alt, base_alt, base_temp, lapse, pressure,
                );
            }
        }
        Self { layers }
    }

    fn pressure_in_layer(
        altitude: f64,
        base_alt: f64,
        base_temp: f64,
        lapse: f64,
        base_pressure: f64,
    ) -> f64 {
        let g_over_r = STANDARD_GRAVITY / AIR_GAS_CONSTANT;
        if lapse == 0.0 {
            base_pressure * (-g_over_r * (altitude - base_alt) / base_temp).exp()
        } else {
            let temp = base_temp + lapse * (altitude - base_alt);
            base_pressure * (temp / base_temp).powf(-g_over_r / lapse)
        }
    }

    fn layer(&self, altitude: f64) -> &(f64, f64, f64, f64) {
        self.layers
            .iter()
            .rev()
            .find(|l| altitude >= l.0)
            .unwrap_or(&self.layers[0])
    }
}

impl Default for StandardAtmosphere {
    fn default() -> Self {
        Self::new()
    }
}

impl AtmosphereCurves for StandardAtmosphere {
    fn temperature(&self, altitude: f64) -> f64 {
        let &(base_alt, base_temp, lapse, _) = self.layer(altitude);
        base_temp + lapse * (altitude - base_alt)
    }

    fn pressure(&self, altitude: f64) -> f64 {
        let &(base_alt, base_temp, lapse, base_pressure) = self.layer(altitude);
        Self::pressure_in_layer(altitude, base_alt, base_temp, lapse, base_pressure)
    }
}

/// Evaluates the air state at the vehicle altitude and produces the wind and
/// turbulence fields. Sea-level temperature and pressure can be overridden
/// through the environment properties.
pub struct AtmosphereModel {
    curves: Box<dyn AtmosphereCurves>,
    wingspan: f64,
    rng: ChaCha8Rng,
    gust: Vector3<f64>,
}

impl AtmosphereModel {
    pub fn new(wingspan: f64, rng_manager: &RngManager) -> Self {
        Self::with_curves(Box::new(StandardAtmosphere::new()), wingspan, rng_manager)
    }

    pub fn with_curves(
        curves: Box<dyn AtmosphereCurves>,
        wingspan: f64,
        rng_manager: &RngManager,
    ) -> Self {
        Self {
            curves,
            wingspan,
            rng: rng_manager.get_rng("atmosphere-turbulence"),
            gust: Vector3::zeros(),
        }
    }

    fn calculate(&mut self, state: &mut SimState) {
        let altitude = state.altitude_asl();

        // Sea-level overrides shift the whole column: the temperature as a
        // bias, the pressure as a scale factor.
        let temp_bias = state
            .bus
            .get_double("/environment/temperature-degc")
            .map(|c| celsius_to_rankine(c) - SL_TEMPERATURE_R)
            .unwrap_or(0.0);
        let pressure_scale = state
            .bus
            .get_double("/environment/pressure-sea-level-inhg")
            .or_else(|| state.bus.get_double("/environment/pressure-inhg"))
            .map(|inhg| inhg * INHG_TO_PSF / SL_PRESSURE_PSF)
            .unwrap_or(1.0);

        let temperature = match state.bus.get_double("atmosphere/override/temperature") {
            Some(t) => t,
            None => self.curves.temperature(altitude) + temp_bias,
        };
        let pressure = self.curves.pressure(altitude) * pressure_scale;

        let out = &mut state.atmosphere;
        out.temperature = temperature;
        out.pressure = pressure;
        out.density = pressure / (AIR_GAS_CONSTANT * temperature);
        out.soundspeed = (SPECIFIC_HEAT_RATIO * AIR_GAS_CONSTANT * temperature).sqrt();

        out.sl_temperature = SL_TEMPERATURE_R + temp_bias;
        out.sl_pressure = SL_PRESSURE_PSF * pressure_scale;
        out.sl_density = out.sl_pressure / (AIR_GAS_CONSTANT * out.sl_temperature);
        out.sl_soundspeed =
            (SPECIFIC_HEAT_RATIO * AIR_GAS_CONSTANT * out.sl_temperature).sqrt();

        out.viscosity =
            VISCOSITY_BETA * temperature.powf(1.5) / (SUTHERLAND_CONSTANT_R + temperature);
        out.kinematic_viscosity = out.viscosity / out.density;
    }

    fn winds(&mut self, state: &mut SimState) {
        // "wind-from" convention: a wind from the north blows southward.
        let wind_ned = -Vector3::new(
            state.bus.get_double_or("/environment/wind-from-north-fps", 0.0),
            state.bus.get_double_or("/environment/wind-from-east-fps", 0.0),
            state.bus.get_double_or("/environment/wind-from-down-fps", 0.0),
        );

        let magnitude = state
            .bus
            .get_double_or("/environment/turbulence/magnitude-fps", 0.0);
        let rate = state
            .bus
            .get_double_or("/environment/turbulence/rate-rad_sec", 1.0);

        if magnitude > 0.0 {
            // First-order chase of a randomly redrawn gust target. The RNG
            // stream is seeded per component, so runs repeat bit-for-bit.
            let target = magnitude
                * Vector3::new(
                    self.rng.gen_range(-1.0..=1.0),
                    self.rng.gen_range(-1.0..=1.0),
                    self.rng.gen_range(-1.0..=1.0),
                );
            let alpha = (rate * state.dt).clamp(0.0, 1.0);
            self.gust += alpha * (target - self.gust);
        } else {
            self.gust = Vector3::zeros();
        }

        state.atmosphere.wind_ned = wind_ned;
        state.atmosphere.turbulence_ned = self.gust;
        // Spanwise/chordwise gradient approximation of the rotary gusts.
        state.atmosphere.turbulence_pqr = Vector3::new(
            self.gust.z / self.wingspan,
            self.gust.z / (4.0 * self.wingspan),
            self.gust.y / self.wingspan,
        );
    }
}

impl Model for AtmosphereModel {
    fn name(&self) -> &str {
        "atmosphere"
    }

    fn init(&mut self, state: &mut SimState) -> Result<(), SimError> {
        self.gust = Vector3::zeros();
        self.calculate(state);
        state.atmosphere.wind_ned = Vector3::zeros();
        state.atmosphere.turbulence_ned = Vector3::zeros();
        state.atmosphere.turbulence_pqr = Vector3::zeros();
        Ok(())
    }

    fn run(&mut self, state: &mut SimState) -> Result<(), SimError> {
        self.calculate(state);
        self.winds(state);
        Ok(())
    }

    fn publish(&self, state: &mut SimState) {
        let atmo = &state.atmosphere;
        let rows = [
            ("atmosphere/T-R", atmo.temperature),
            ("atmosphere/P-psf", atmo.pressure),
            ("atmosphere/rho-slugs_ft3", atmo.density),
            ("atmosphere/a-fps", atmo.soundspeed),
            ("atmosphere/T-sl-R", atmo.sl_temperature),
            ("atmosphere/rho-sl-slugs_ft3", atmo.sl_density),
            ("atmosphere/a-sl-fps", atmo.sl_soundspeed),
            ("atmosphere/theta", atmo.temperature / atmo.sl_temperature),
            ("atmosphere/sigma", atmo.density / atmo.sl_density),
            ("atmosphere/delta", atmo.pressure / atmo.sl_pressure),
            ("atmosphere/a-ratio", atmo.soundspeed / atmo.sl_soundspeed),
            ("atmosphere/turb-north-fps", atmo.turbulence_ned.x),
            ("atmosphere/turb-east-fps", atmo.turbulence_ned.y),
            ("atmosphere/turb-down-fps", atmo.turbulence_ned.z),
        ];
        for (name, value) in rows {
            state.bus.set_double(name, value);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sea_level_standard_day() {
        let atmo = StandardAtmosphere::new();
        assert_relative_eq!(atmo.temperature(0.0), 518.67, epsilon = 1e-9);
        assert_relative_eq!(atmo.pressure(0.0), 2116.22, epsilon = 1e-9);
        let density = atmo.pressure(0.0) / (AIR_GAS_CONSTANT * atmo.temperature(0.0));
        assert_relative_eq!(density, 0.0023769, epsilon = 1e-6);
    }

    #[test]
    fn test_tropopause() {
        let atmo = StandardAtmosphere::new();
        // Isothermal layer above 36,089 ft
        assert_relative_eq!(atmo.temperature(36_089.24), 389.97, epsilon = 1e-6);
        assert_relative_eq!(atmo.temperature(50_000.0), 389.97, epsilon = 1e-6);
        // Pressure at the tropopause is about 472.7 psf
        assert_relative_eq!(atmo.pressure(36_089.24), 472.68, epsilon = 0.5);
    }

    #[test]
    fn test_pressure_continuous_across_layers() {
        let atmo = StandardAtmosphere::new();
        for boundary in [36_089.24, 65_616.80, 104_986.87, 154_199.48] {
            let below = atmo.pressure(boundary - 0.01);
            let above = atmo.pressure(boundary + 0.01);
            assert_relative_eq!(below, above, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_model_with_sl_overrides() {
        let manager = RngManager::new(1);
        let mut model = AtmosphereModel::new(36.0, &manager);
        let mut state = SimState::new(0.01);

        state.bus.set_double("/environment/temperature-degc", 30.0);
        state.bus.set_double("/environment/pressure-sea-level-inhg", 29.0);
        model.run(&mut state).unwrap();

        assert_relative_eq!(
            state.atmosphere.sl_temperature,
            celsius_to_rankine(30.0),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            state.atmosphere.sl_pressure,
            29.0 * INHG_TO_PSF,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_turbulence_is_deterministic() {
        let manager = RngManager::new(7);
        let mut state_a = SimState::new(0.01);
        let mut state_b = SimState::new(0.01);
        state_a
            .bus
            .set_double("/environment/turbulence/magnitude-fps", 10.0);
        state_b
            .bus
            .set_double("/environment/turbulence/magnitude-fps", 10.0);

        let mut model_a = AtmosphereModel::new(36.0, &manager);
        let mut model_b = AtmosphereModel::new(36.0, &manager);
        for _ in 0..25 {
            model_a.run(&mut state_a).unwrap();
            model_b.run(&mut state_b).unwrap();
        }
        assert_eq!(state_a.atmosphere.turbulence_ned, state_b.atmosphere.turbulence_ned);
        assert!(state_a.atmosphere.turbulence_ned.norm() > 0.0);
    }

    #[test]
    fn test_no_turbulence_without_magnitude() {
        let manager = RngManager::new(7);
        let mut model = AtmosphereModel::new(36.0, &manager);
        let mut state = SimState::new(0.01);
        for _ in 0..10 {
            model.run(&mut state).unwrap();
        }
        assert_eq!(state.atmosphere.turbulence_ned, Vector3::zeros());
        assert_eq!(state.atmosphere.turbulence_pqr, Vector3::zeros());
    }
}
