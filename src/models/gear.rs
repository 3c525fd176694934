use log::{info, warn};
use nalgebra::Vector3;

use crate::config::{BrakeGroup, ContactKind, DampingType, GearConfig, SteerType};
use crate::ground::GroundCallback;
use crate::models::mass_balance::structural_to_body;
use crate::state::{GearReport, SimState};
use crate::utils::errors::SimError;
use crate::utils::filter::LagFilter;
use crate::utils::math::{deg_to_rad, rad_to_deg, sign};
use crate::utils::table::Table1D;

// Pacejka magic-formula defaults; the peak factor is the static friction.
const PACEJKA_STIFFNESS: f64 = 0.06;
const PACEJKA_SHAPE: f64 = 2.8;
const PACEJKA_CURVATURE: f64 = 1.03;

// Crash thresholds
const CRASH_COMPRESSION: f64 = 500.0; // ft
const CRASH_FORCE: f64 = 1.0e8; // lbf
const CRASH_MOMENT: f64 = 5.0e9; // lbf*ft
const CRASH_SINK_RATE: f64 = 44.0; // ft/s

pub(crate) struct GearUpdate {
    pub force: Vector3<f64>,
    pub moment: Vector3<f64>,
    pub crashed: bool,
}

/// One tire/strut contact unit: spring/damper strut, braking, steering,
/// Pacejka lateral force, retraction, and touchdown reporting.
pub struct LandingGear {
    name: String,
    kind: ContactKind,
    location: Vector3<f64>,
    spring_coeff: f64,
    damping_coeff: f64,
    damping_type: DampingType,
    damping_coeff_rebound: f64,
    damping_type_rebound: DampingType,
    static_friction: f64,
    rolling_friction: f64,
    max_steer: f64,
    steer_type: SteerType,
    brake_group: BrakeGroup,
    retractable: bool,
    cornering_table: Option<Table1D>,
    rfrv: f64,
    sfrv: f64,
    tire_pressure_norm: f64,

    long_force_filter: LagFilter,
    lat_force_filter: LagFilter,
    wheel_slip_filter: LagFilter,
    long_filter_active: bool,
    lat_filter_active: bool,
    slip_filter_active: bool,

    gear_down: bool,
    gear_pos: f64,
    wow: bool,
    last_wow: bool,
    compress_length: f64,
    compress_speed: f64,
    steer_angle: f64,
    wheel_slip_deg: f64,
    rolling_vel: f64,
    side_vel: f64,
    side_coeff: f64,

    first_contact: bool,
    started_ground_run: bool,
    takeoff_reported: bool,
    landing_reported: bool,
    landing_distance: f64,
    takeoff_distance: f64,
    takeoff_distance_50ft: f64,
    max_strut_force: f64,
    max_strut_travel: f64,
    sink_rate: f64,
    contact_ground_speed: f64,
}

impl LandingGear {
    pub fn new(config: &GearConfig, dt: f64) -> Result<Self, SimError> {
        config.validate()?;
        let cornering_table = match &config.cornering_table {
            Some(rows) => Some(Table1D::new(rows.clone())?),
            None => None,
        };
        // An unset lag coefficient defaults to the frame rate, where the
        // contact jitter lives.
        let frame_rate = 1.0 / dt;
        let long_coeff = config.rolling_force_lag.unwrap_or(frame_rate);
        let lat_coeff = config.side_force_lag.unwrap_or(frame_rate);
        let slip_coeff = config.wheel_slip_lag.unwrap_or(frame_rate);
        Ok(Self {
            name: config.name.clone(),
            kind: config.kind,
            location: config.location,
            spring_coeff: config.spring_coeff,
            damping_coeff: config.damping_coeff,
            damping_type: config.damping_type,
            damping_coeff_rebound: config.damping_coeff_rebound.unwrap_or(config.damping_coeff),
            damping_type_rebound: config.damping_type_rebound.unwrap_or(config.damping_type),
            static_friction: config.static_friction,
            rolling_friction: config.rolling_friction,
            max_steer: config.max_steer,
            steer_type: config.steer_type,
            brake_group: config.brake_group,
            retractable: config.retractable,
            cornering_table,
            rfrv: config.rolling_relaxation_velocity,
            sfrv: config.side_relaxation_velocity,
            tire_pressure_norm: config.tire_pressure_norm,
            long_force_filter: LagFilter::new(long_coeff, dt),
            lat_force_filter: LagFilter::new(lat_coeff, dt),
            wheel_slip_filter: LagFilter::new(slip_coeff, dt),
            long_filter_active: long_coeff > 0.0,
            lat_filter_active: lat_coeff > 0.0,
            slip_filter_active: slip_coeff > 0.0,
            gear_down: true,
            gear_pos: 1.0,
            wow: false,
            last_wow: false,
            compress_length: 0.0,
            compress_speed: 0.0,
            steer_angle: 0.0,
            wheel_slip_deg: 0.0,
            rolling_vel: 0.0,
            side_vel: 0.0,
            side_coeff: 0.0,
            first_contact: false,
            started_ground_run: false,
            takeoff_reported: false,
            landing_reported: false,
            landing_distance: 0.0,
            takeoff_distance: 0.0,
            takeoff_distance_50ft: 0.0,
            max_strut_force: 0.0,
            max_strut_travel: 0.0,
            sink_rate: 0.0,
            contact_ground_speed: 0.0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_bogey(&self) -> bool {
        self.kind == ContactKind::Bogey
    }

    pub fn report(&self) -> GearReport {
        GearReport {
            wow: self.wow,
            compress_length: self.compress_length,
            compress_speed: self.compress_speed,
            side_coeff: self.side_coeff,
            wheel_speed: self.rolling_vel,
            slip_angle_deg: self.wheel_slip_deg,
            steer_angle: self.steer_angle,
            pos_norm: self.gear_pos,
        }
    }

    pub(crate) fn update(&mut self, state: &SimState, ground: &dyn GroundCallback) -> GearUpdate {
        let dt = state.dt;
        let mut force = Vector3::zeros();
        let mut moment = Vector3::zeros();

        let wheel_body = structural_to_body(self.location, state.mass.cg);
        let wheel_local = state.frames.tb2l * wheel_body;

        self.gear_pos = if self.retractable {
            state.fcs.gear_pos
        } else {
            1.0
        };
        let gear_up = self.gear_pos < 0.01;
        self.gear_down = self.gear_pos > 0.99;
        if gear_up {
            self.wow = false;
        }

        if self.gear_down {
            let gear_loc = state.core.location.local_to_location(wheel_local);

            // Neighborhood hint: the gear arm plus two steps of translation.
            let radius_hint = wheel_body.norm() + 2.0 * dt * state.core.v_uvw.norm();
            let contact = ground.contact(state.sim_time, &gear_loc, radius_hint);

            // Compression is measured along local Z only.
            self.compress_length = -contact.agl;

            if self.compress_length > 0.0 {
                self.wow = true;

                let contact_vel_ned = state.frames.tec2l * contact.velocity;
                let wheel_vel = state.frames.tb2l * state.core.v_pqr.cross(&wheel_body)
                    + state.propagate.v_vel
                    - contact_vel_ned;
                self.compress_speed = wheel_vel.z;

                self.initialize_reporting(state);
                let brake_coeff = self.brake_force_coefficient(state);
                let psi = state.core.euler().z;
                self.compute_steering_angle(psi, state.fcs.steer_pos_norm, &wheel_vel);
                let (sin_wheel, cos_wheel) = (psi + self.steer_angle).sin_cos();
                self.compute_slip_angle(&wheel_vel, sin_wheel, cos_wheel);
                self.side_coeff = self.side_force_coefficient();
                let strut_force = self.vertical_strut_force();

                // Forces in the wheel ground plane.
                let rolling_force = (0.3 * (1.0 - self.tire_pressure_norm)
                    + strut_force * brake_coeff)
                    * sign(self.rolling_vel);
                let side_force = strut_force * self.side_coeff;

                // Rotate back into the local frame, then to the body.
                let local_force = Vector3::new(
                    rolling_force * cos_wheel - side_force * sin_wheel,
                    side_force * cos_wheel + rolling_force * sin_wheel,
                    strut_force,
                );
                force = state.frames.tl2b * local_force;

                // Lag and attenuate the ground-plane components to keep the
                // at-rest jitter out of the force sum.
                if self.long_filter_active {
                    force.x = self.long_force_filter.execute(force.x);
                }
                if self.lat_filter_active {
                    force.y = self.lat_force_filter.execute(force.y);
                }
                if self.rolling_vel.abs() <= self.rfrv && self.rfrv > 0.0 {
                    force.x *= self.rolling_vel.abs() / self.rfrv;
                }
                if self.side_vel.abs() <= self.sfrv && self.sfrv > 0.0 {
                    force.y *= self.side_vel.abs() / self.sfrv;
                }

                moment = wheel_body.cross(&force);
            } else {
                self.wow = false;
                self.compress_length = 0.0;
                self.compress_speed = 0.0;
                self.rolling_vel = 0.0;
                self.side_vel = 0.0;
                self.wheel_slip_deg = 0.0;

                // Return the wheel toward center as the gear comes up.
                self.steer_angle *= ((self.gear_pos - 0.8) / 0.2).max(0.0);

                self.reset_reporting(state);
            }
        }

        self.report_takeoff_or_landing(state, wheel_local.z);

        // Both this tick and the previous one must carry weight before the
        // crash checks fire, so WOW can still gate scripted runs.
        let mut crashed = false;
        if self.wow && self.last_wow {
            crashed = self.crash_detect(&force, &moment);
        }
        self.last_wow = self.wow;

        GearUpdate {
            force,
            moment,
            crashed,
        }
    }

    fn brake_force_coefficient(&self, state: &SimState) -> f64 {
        let brake = match self.brake_group {
            BrakeGroup::Left => state.fcs.brake_left,
            BrakeGroup::Right => state.fcs.brake_right,
            BrakeGroup::Center | BrakeGroup::Nose | BrakeGroup::Tail => state.fcs.brake_center,
            BrakeGroup::None => return self.rolling_friction,
        };
        self.rolling_friction * (1.0 - brake) + self.static_friction * brake
    }

    fn compute_steering_angle(&mut self, psi: f64, steer_cmd: f64, wheel_vel: &Vector3<f64>) {
        match self.steer_type {
            SteerType::Steerable => {
                self.steer_angle = deg_to_rad(self.max_steer) * steer_cmd;
            }
            SteerType::Fixed => self.steer_angle = 0.0,
            SteerType::Castered => {
                // Align the wheel with the local horizontal velocity vector.
                if wheel_vel.x.hypot(wheel_vel.y) > 0.1 {
                    self.steer_angle = wheel_vel.y.atan2(wheel_vel.x) - psi;
                }
            }
        }
    }

    fn compute_slip_angle(&mut self, wheel_vel: &Vector3<f64>, sin_wheel: f64, cos_wheel: f64) {
        self.rolling_vel = wheel_vel.x * cos_wheel + wheel_vel.y * sin_wheel;
        self.side_vel = wheel_vel.y * cos_wheel - wheel_vel.x * sin_wheel;
        let mut slip = rad_to_deg(self.side_vel.atan2(self.rolling_vel.abs()));
        if self.slip_filter_active {
            slip = self.wheel_slip_filter.execute(slip);
        }
        self.wheel_slip_deg = slip;
    }

    fn side_force_coefficient(&self) -> f64 {
        match &self.cornering_table {
            Some(table) => table.value(self.wheel_slip_deg),
            None => {
                let stiff_slip = PACEJKA_STIFFNESS * self.wheel_slip_deg;
                self.static_friction
                    * (PACEJKA_SHAPE
                        * (stiff_slip - PACEJKA_CURVATURE * (stiff_slip - stiff_slip.atan()))
                            .atan())
                    .sin()
            }
        }
    }

    /// Spring plus damping, never attractive toward the ground.
    fn vertical_strut_force(&mut self) -> f64 {
        let spring_force = -self.compress_length * self.spring_coeff;

        let damp_force = if self.compress_speed >= 0.0 {
            match self.damping_type {
                DampingType::Linear => -self.compress_speed * self.damping_coeff,
                DampingType::Square => {
                    -self.compress_speed * self.compress_speed * self.damping_coeff
                }
            }
        } else {
            match self.damping_type_rebound {
                DampingType::Linear => -self.compress_speed * self.damping_coeff_rebound,
                DampingType::Square => {
                    self.compress_speed * self.compress_speed * self.damping_coeff_rebound
                }
            }
        };

        let total = (spring_force + damp_force).min(0.0);
        self.max_strut_force = self.max_strut_force.max(total.abs());
        self.max_strut_travel = self.max_strut_travel.max(self.compress_length.abs());
        total
    }

    fn initialize_reporting(&mut self, state: &SimState) {
        if !self.first_contact {
            self.first_contact = true;
            self.sink_rate = self.compress_speed;
            self.contact_ground_speed = state.propagate.v_vel.norm();
            self.takeoff_reported = false;
        }

        if !self.started_ground_run
            && state.propagate.v_vel.norm() > 0.1
            && state.fcs.brake_left == 0.0
            && state.fcs.brake_right == 0.0
            && state.fcs.throttle_pos.first().copied().unwrap_or(0.0) > 0.90
        {
            self.takeoff_distance = 0.0;
            self.takeoff_distance_50ft = 0.0;
            self.started_ground_run = true;
        }
    }

    fn reset_reporting(&mut self, state: &SimState) {
        if state.altitude_agl() > 200.0 {
            self.first_contact = false;
            self.started_ground_run = false;
            self.landing_reported = false;
            self.takeoff_reported = true;
            self.landing_distance = 0.0;
            self.max_strut_force = 0.0;
            self.max_strut_travel = 0.0;
        }
    }

    fn report_takeoff_or_landing(&mut self, state: &SimState, wheel_local_z: f64) {
        let dt = state.dt;
        if self.first_contact {
            self.landing_distance += state.aux.vground * dt;
        }
        if self.started_ground_run {
            self.takeoff_distance_50ft += state.aux.vground * dt;
            if self.wow {
                self.takeoff_distance += state.aux.vground * dt;
            }
        }

        if !self.landing_reported && state.ground.wow && state.aux.vground <= 0.05 {
            info!(
                "Touchdown report for {}: sink rate {:.2} ft/s, ground speed {:.1} ft/s, \
                 max strut force {:.0} lbs, max strut travel {:.2} ft, \
                 distance traveled {:.0} ft",
                self.name,
                self.sink_rate,
                self.contact_ground_speed,
                self.max_strut_force,
                self.max_strut_travel,
                self.landing_distance
            );
            self.landing_reported = true;
        }

        if !self.takeoff_reported
            && !state.ground.wow
            && (state.altitude_agl() - wheel_local_z) > 50.0
        {
            info!(
                "Takeoff report for {}: ground roll {:.0} ft, distance over 50 ft {:.0} ft",
                self.name, self.takeoff_distance, self.takeoff_distance_50ft
            );
            self.takeoff_reported = true;
        }
    }

    fn crash_detect(&self, force: &Vector3<f64>, moment: &Vector3<f64>) -> bool {
        let crashed = self.compress_length > CRASH_COMPRESSION
            || force.norm() > CRASH_FORCE
            || moment.norm() > CRASH_MOMENT
            || self.sink_rate > CRASH_SINK_RATE;
        if crashed {
            warn!("Crash detected at gear {}: simulation freeze", self.name);
        }
        crashed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::Location;
    use crate::ground::FlatTerrain;
    use approx::assert_relative_eq;

    fn test_gear(config_tweak: impl FnOnce(&mut GearConfig)) -> LandingGear {
        let mut config =
            GearConfig::simple_bogey("test", Vector3::zeros(), 1000.0, 50.0);
        // Bypass the jitter filters so single updates show raw forces.
        config.rolling_force_lag = Some(0.0);
        config.side_force_lag = Some(0.0);
        config.wheel_slip_lag = Some(0.0);
        config_tweak(&mut config);
        LandingGear::new(&config, 0.01).unwrap()
    }

    fn state_at_agl(agl: f64) -> (SimState, FlatTerrain) {
        let mut state = SimState::new(0.01);
        let terrain_radius = state.terrain.sea_level_radius;
        state.core.location = Location::from_lon_lat_radius(0.0, 0.0, terrain_radius + agl);
        state.terrain.local_terrain_radius = terrain_radius;
        state.refresh_frames();
        (state, FlatTerrain::new(terrain_radius))
    }

    #[test]
    fn test_spring_force_tracks_compression() {
        let mut gear = test_gear(|_| {});
        let (state, terrain) = state_at_agl(-2.0);

        let update = gear.update(&state, &terrain);
        let report = gear.report();
        assert!(report.wow);
        assert_relative_eq!(report.compress_length, 2.0, epsilon = 1e-9);
        // Body and local frames coincide here: 2 ft on a 1000 lb/ft spring.
        assert_relative_eq!(update.force.z, -2000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_linear_damping_adds_to_spring() {
        let mut gear = test_gear(|_| {});
        let (mut state, terrain) = state_at_agl(-2.0);
        state.propagate.v_vel.z = 2.0; // compressing at 2 ft/s

        let update = gear.update(&state, &terrain);
        assert_relative_eq!(update.force.z, -(2000.0 + 50.0 * 2.0), epsilon = 1e-9);
    }

    #[test]
    fn test_square_law_damping() {
        let mut gear = test_gear(|c| c.damping_type = DampingType::Square);
        let (mut state, terrain) = state_at_agl(-2.0);
        state.propagate.v_vel.z = 2.0;

        let update = gear.update(&state, &terrain);
        assert_relative_eq!(update.force.z, -(2000.0 + 50.0 * 4.0), epsilon = 1e-9);
    }

    #[test]
    fn test_rebound_uses_its_own_coefficient() {
        let mut gear = test_gear(|c| c.damping_coeff_rebound = Some(10.0));
        let (mut state, terrain) = state_at_agl(-2.0);
        state.propagate.v_vel.z = -3.0; // strut extending

        let update = gear.update(&state, &terrain);
        assert_relative_eq!(update.force.z, -(2000.0 - 10.0 * 3.0), epsilon = 1e-9);
    }

    #[test]
    fn test_strut_never_pulls() {
        // Rapid extension overwhelms a light spring: clamp at zero, never
        // suck the wheel down.
        let mut gear = test_gear(|_| {});
        let (mut state, terrain) = state_at_agl(-0.01);
        state.propagate.v_vel.z = -100.0;

        let update = gear.update(&state, &terrain);
        assert_relative_eq!(update.force.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_braking_raises_rolling_friction() {
        let run = |brake: f64| {
            let mut gear = test_gear(|c| c.brake_group = BrakeGroup::Left);
            let (mut state, terrain) = state_at_agl(-1.0);
            state.propagate.v_vel.x = 10.0;
            state.fcs.brake_left = brake;
            gear.update(&state, &terrain).force.x
        };

        let free = run(0.0);
        let braked = run(1.0);
        // mu goes from rolling (0.02) to static (0.8)
        assert_relative_eq!(free, -1000.0 * 0.02, epsilon = 1e-6);
        assert_relative_eq!(braked, -1000.0 * 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_steerable_wheel_follows_command() {
        let mut gear = test_gear(|c| {
            c.steer_type = SteerType::Steerable;
            c.max_steer = 30.0;
        });
        let (mut state, terrain) = state_at_agl(-1.0);
        state.propagate.v_vel.x = 10.0;
        state.fcs.steer_pos_norm = 0.5;

        gear.update(&state, &terrain);
        assert_relative_eq!(gear.report().steer_angle, deg_to_rad(15.0), epsilon = 1e-12);
    }

    #[test]
    fn test_castered_wheel_aligns_with_velocity() {
        let mut gear = test_gear(|c| c.steer_type = SteerType::Castered);
        let (mut state, terrain) = state_at_agl(-1.0);
        state.propagate.v_vel.x = 10.0;
        state.propagate.v_vel.y = 10.0;

        gear.update(&state, &terrain);
        assert_relative_eq!(
            gear.report().steer_angle,
            std::f64::consts::FRAC_PI_4,
            epsilon = 1e-12
        );
        // A castered wheel rolls freely along its track: no side force.
        assert_relative_eq!(gear.report().slip_angle_deg, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_retracted_gear_produces_no_force() {
        let mut gear = test_gear(|c| c.retractable = true);
        let (mut state, terrain) = state_at_agl(-1.0);
        state.fcs.gear_pos = 0.0;

        let update = gear.update(&state, &terrain);
        assert!(!gear.report().wow);
        assert_relative_eq!(update.force.norm(), 0.0, epsilon = 1e-12);

        // Lower it and the strut engages again.
        state.fcs.gear_pos = 1.0;
        let update = gear.update(&state, &terrain);
        assert!(gear.report().wow);
        assert!(update.force.z < 0.0);
    }

    #[test]
    fn test_cornering_table_overrides_pacejka() {
        let mut gear = test_gear(|c| {
            c.cornering_table = Some(vec![(-90.0, -0.5), (0.0, 0.0), (90.0, 0.5)]);
        });
        let (mut state, terrain) = state_at_agl(-1.0);
        // Pure sideways slide: 90 degrees of slip.
        state.propagate.v_vel.y = 20.0;

        gear.update(&state, &terrain);
        assert_relative_eq!(gear.report().side_coeff, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_overcompression_crashes_on_second_tick() {
        let mut gear = test_gear(|_| {});
        let (state, terrain) = state_at_agl(-600.0);

        // The WOW flag must persist for two ticks before the check fires.
        let first = gear.update(&state, &terrain);
        assert!(!first.crashed);
        let second = gear.update(&state, &terrain);
        assert!(second.crashed);
    }
}
