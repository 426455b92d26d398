use crate::events::noise::uniform_times;
use crate::events::pspl::PsplLightCurve;
use crate::events::types::TripleArray;

use lazy_static::lazy_static;

pub(crate) mod astrometry;
pub(crate) mod noise;
pub(crate) mod pspl;
pub(crate) mod types;

/// Noisy light curve together with the parameters it was generated with
#[derive(Clone, Debug)]
pub struct SyntheticEvent {
    pub name: &'static str,
    pub truth: PsplLightCurve,
    pub photometry: TripleArray,
}

impl SyntheticEvent {
    fn new(
        name: &'static str,
        truth: PsplLightCurve,
        (start, end, n): (f64, f64, usize),
        mag_err: f64,
        seed: u64,
    ) -> Self {
        let photometry = truth.observe(uniform_times(start, end, n), mag_err, seed);
        Self {
            name,
            truth,
            photometry,
        }
    }
}

lazy_static! {
    pub static ref SYNTHETIC_PSPL_EVENTS: Vec<SyntheticEvent> = vec![
        SyntheticEvent::new(
            "high-magnification",
            PsplLightCurve {
                t0: 57_000.0,
                u0_amp: 0.05,
                t_e: 25.0,
                mag_src: 20.0,
                b_sff: 1.0,
            },
            (56_850.0, 57_150.0, 300),
            0.02,
            0,
        ),
        SyntheticEvent::new(
            "blended",
            PsplLightCurve {
                t0: 57_100.0,
                u0_amp: 0.3,
                t_e: 60.0,
                mag_src: 19.0,
                b_sff: 0.6,
            },
            (56_800.0, 57_400.0, 400),
            0.01,
            1,
        ),
        SyntheticEvent::new(
            "faint",
            PsplLightCurve {
                t0: 58_000.0,
                u0_amp: 0.7,
                t_e: 120.0,
                mag_src: 21.5,
                b_sff: 0.9,
            },
            (57_500.0, 58_500.0, 150),
            0.1,
            2,
        ),
    ];
}
