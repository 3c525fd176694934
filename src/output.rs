use std::io::Write;

use serde::Serialize;

use crate::state::SimState;
use crate::utils::constants::FPS_TO_KTS;
use crate::utils::errors::SimError;

/// One output row, the headline state in English units.
#[derive(Debug, Clone, Serialize)]
pub struct SimRecord {
    pub time: f64,
    pub longitude_rad: f64,
    pub latitude_geod_rad: f64,
    pub altitude_asl_ft: f64,
    pub altitude_agl_ft: f64,
    pub phi_rad: f64,
    pub theta_rad: f64,
    pub psi_rad: f64,
    pub u_fps: f64,
    pub v_fps: f64,
    pub w_fps: f64,
    pub p_rad_sec: f64,
    pub q_rad_sec: f64,
    pub r_rad_sec: f64,
    pub vt_fps: f64,
    pub vc_kts: f64,
    pub mach: f64,
    pub alpha_rad: f64,
    pub beta_rad: f64,
    pub n_z: f64,
    pub total_fuel_lbs: f64,
    pub wow: bool,
}

impl SimRecord {
    pub fn from_state(state: &SimState) -> Self {
        let euler = state.core.euler();
        let (geod_lat, _) = state.core.location.geodetic();
        Self {
            time: state.sim_time,
            longitude_rad: state.core.location.longitude(),
            latitude_geod_rad: geod_lat,
            altitude_asl_ft: state.altitude_asl(),
            altitude_agl_ft: state.altitude_agl(),
            phi_rad: euler.x,
            theta_rad: euler.y,
            psi_rad: euler.z,
            u_fps: state.core.v_uvw.x,
            v_fps: state.core.v_uvw.y,
            w_fps: state.core.v_uvw.z,
            p_rad_sec: state.core.v_pqr.x,
            q_rad_sec: state.core.v_pqr.y,
            r_rad_sec: state.core.v_pqr.z,
            vt_fps: state.aux.vt,
            vc_kts: state.aux.vcas * FPS_TO_KTS,
            mach: state.aux.mach,
            alpha_rad: state.aux.alpha,
            beta_rad: state.aux.beta,
            n_z: state.aux.n_z,
            total_fuel_lbs: state.propulsion.total_fuel_lbs,
            wow: state.ground.wow,
        }
    }
}

/// Writes one JSON line per recorded tick, optionally decimated.
pub struct Recorder<W: Write> {
    writer: W,
    every: usize,
    count: usize,
}

impl<W: Write> Recorder<W> {
    pub fn new(writer: W) -> Self {
        Self::with_decimation(writer, 1)
    }

    /// Record every Nth tick.
    pub fn with_decimation(writer: W, every: usize) -> Self {
        Self {
            writer,
            every: every.max(1),
            count: 0,
        }
    }

    pub fn record(&mut self, state: &SimState) -> Result<(), SimError> {
        self.count += 1;
        if self.count % self.every != 0 {
            return Ok(());
        }
        let record = SimRecord::from_state(state);
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
