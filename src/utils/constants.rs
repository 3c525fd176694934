// WGS-84 Earth model, English units (ft, slug, s, Rankine)
pub const EARTH_GM: f64 = 14.07644180e15; // ft^3/s^2
pub const EARTH_RADIUS_REFERENCE: f64 = 20_925_650.0; // ft, equatorial
pub const EARTH_SEMIMAJOR: f64 = 20_925_646.3255; // ft
pub const EARTH_SEMIMINOR: f64 = 20_855_486.5951; // ft
pub const EARTH_ROTATION_RATE: f64 = 7.292115e-5; // rad/s

// Sea-level standard day
pub const SL_TEMPERATURE_R: f64 = 518.67; // Rankine
pub const SL_PRESSURE_PSF: f64 = 2116.22; // lbf/ft^2
pub const AIR_GAS_CONSTANT: f64 = 1716.56; // ft*lbf/(slug*R)
pub const SPECIFIC_HEAT_RATIO: f64 = 1.4;

// Sutherland viscosity law
pub const SUTHERLAND_CONSTANT_R: f64 = 198.72; // Rankine
pub const VISCOSITY_BETA: f64 = 2.269690e-8; // slug/(s*ft*sqrt(R))

pub const STANDARD_GRAVITY: f64 = 32.174; // ft/s^2

// Unit conversions
pub const SLUG_TO_LBS: f64 = 32.174049;
pub const LBS_TO_SLUG: f64 = 1.0 / SLUG_TO_LBS;
pub const INCH_TO_FT: f64 = 1.0 / 12.0;
pub const FT_TO_INCH: f64 = 12.0;
pub const INHG_TO_PSF: f64 = 70.7180803;
pub const KTS_TO_FPS: f64 = 1.6878099;
pub const FPS_TO_KTS: f64 = 1.0 / KTS_TO_FPS;

// Mean molecular weights for buoyant gas densities (lbm/lbmol)
pub const MOLECULAR_WEIGHT_AIR: f64 = 28.9645;
pub const MOLECULAR_WEIGHT_HELIUM: f64 = 4.0026;
pub const MOLECULAR_WEIGHT_HYDROGEN: f64 = 2.0159;
