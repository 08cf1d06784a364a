#[cfg(feature = "reblur")]
mod reblur;
#[cfg(feature = "reference")]
mod reference;
#[cfg(feature = "relax")]
mod relax;
#[cfg(feature = "sigma")]
mod sigma;

use std::sync::Arc;

#[cfg(feature = "reblur")]
pub use self::reblur::*;
#[cfg(feature = "reference")]
pub use self::reference::*;
#[cfg(feature = "relax")]
pub use self::relax::*;
#[cfg(feature = "sigma")]
pub use self::sigma::*;
use crate::{Error, ExternalSlot, Family, Permutation, Result};

/// Algorithm a denoiser runs.
#[derive(Clone, Debug)]
pub enum Denoiser {
    /// Plain accumulation, for ground-truth comparisons
    Reference,

    SigmaShadow,
    ReblurDiffuse,
    ReblurSpecular,
    ReblurDiffuseSpecular,
    RelaxDiffuse,
    RelaxSpecular,
    RelaxDiffuseSpecular,

    /// Caller-provided algorithm
    Custom(Arc<dyn Family>),
}

impl Denoiser {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::SigmaShadow => "sigma_shadow",
            Self::ReblurDiffuse => "reblur_diffuse",
            Self::ReblurSpecular => "reblur_specular",
            Self::ReblurDiffuseSpecular => "reblur_diffuse_specular",
            Self::RelaxDiffuse => "relax_diffuse",
            Self::RelaxSpecular => "relax_specular",
            Self::RelaxDiffuseSpecular => "relax_diffuse_specular",
            Self::Custom(family) => family.name(),
        }
    }

    /// Returns whether this build has been compiled with given denoiser.
    pub fn is_supported(&self) -> bool {
        match self {
            Self::Reference => cfg!(feature = "reference"),
            Self::SigmaShadow => cfg!(feature = "sigma"),

            Self::ReblurDiffuse
            | Self::ReblurSpecular
            | Self::ReblurDiffuseSpecular => cfg!(feature = "reblur"),

            Self::RelaxDiffuse
            | Self::RelaxSpecular
            | Self::RelaxDiffuseSpecular => cfg!(feature = "relax"),

            Self::Custom(_) => true,
        }
    }

    #[allow(unreachable_patterns)]
    pub(crate) fn family(&self) -> Result<Arc<dyn Family>> {
        match self {
            #[cfg(feature = "reference")]
            Self::Reference => Ok(Arc::new(Reference)),

            #[cfg(feature = "sigma")]
            Self::SigmaShadow => Ok(Arc::new(SigmaShadow)),

            #[cfg(feature = "reblur")]
            Self::ReblurDiffuse => Ok(Arc::new(Reblur::new(Signal::Diffuse))),

            #[cfg(feature = "reblur")]
            Self::ReblurSpecular => {
                Ok(Arc::new(Reblur::new(Signal::Specular)))
            }

            #[cfg(feature = "reblur")]
            Self::ReblurDiffuseSpecular => {
                Ok(Arc::new(Reblur::new(Signal::DiffuseSpecular)))
            }

            #[cfg(feature = "relax")]
            Self::RelaxDiffuse => Ok(Arc::new(Relax::new(Signal::Diffuse))),

            #[cfg(feature = "relax")]
            Self::RelaxSpecular => Ok(Arc::new(Relax::new(Signal::Specular))),

            #[cfg(feature = "relax")]
            Self::RelaxDiffuseSpecular => {
                Ok(Arc::new(Relax::new(Signal::DiffuseSpecular)))
            }

            Self::Custom(family) => Ok(family.clone()),

            _ => Err(Error::UnsupportedDenoiser(self.name())),
        }
    }
}

/// Which radiance signals a denoiser works on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Diffuse,
    Specular,
    DiffuseSpecular,
}

impl Signal {
    pub fn name(self) -> &'static str {
        match self {
            Self::Diffuse => "diffuse",
            Self::Specular => "specular",
            Self::DiffuseSpecular => "diffuse_specular",
        }
    }

    pub fn channels(self) -> &'static [Channel] {
        match self {
            Self::Diffuse => &[Channel::Diffuse],
            Self::Specular => &[Channel::Specular],
            Self::DiffuseSpecular => &[Channel::Diffuse, Channel::Specular],
        }
    }

    pub fn has_diffuse(self) -> bool {
        self != Self::Specular
    }

    pub fn has_specular(self) -> bool {
        self != Self::Diffuse
    }
}

/// Single radiance signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Diffuse,
    Specular,
}

impl Channel {
    pub fn input(self) -> ExternalSlot {
        match self {
            Self::Diffuse => ExternalSlot::InDiffuseRadiance,
            Self::Specular => ExternalSlot::InSpecularRadiance,
        }
    }

    pub fn confidence(self) -> ExternalSlot {
        match self {
            Self::Diffuse => ExternalSlot::InDiffuseConfidence,
            Self::Specular => ExternalSlot::InSpecularConfidence,
        }
    }

    pub fn output(self) -> ExternalSlot {
        match self {
            Self::Diffuse => ExternalSlot::OutDiffuseRadiance,
            Self::Specular => ExternalSlot::OutSpecularRadiance,
        }
    }
}

/// Returns the name of the kernel implementing given permutation of a pass,
/// e.g. `reblur_diffuse_prepass_perf_cb`.
pub(crate) fn kernel_name(
    prefix: &str,
    pass: &str,
    permutation: Permutation,
) -> String {
    use crate::HitDistanceReconstruction as Hdr;

    let mut name = format!("{prefix}_{pass}");

    if permutation.performance_mode {
        name.push_str("_perf");
    }

    if permutation.checkerboard {
        name.push_str("_cb");
    }

    if permutation.confidence_inputs {
        name.push_str("_conf");
    }

    match permutation.hit_distance_reconstruction {
        Hdr::Off => {}
        Hdr::Area3x3 => name.push_str("_3x3"),
        Hdr::Area5x5 => name.push_str("_5x5"),
    }

    if permutation.history_reset {
        name.push_str("_reset");
    }

    name
}

/// Clamps a setting into given range, complaining if it didn't fit.
pub(crate) fn clamp_setting<T>(name: &str, value: T, min: T, max: T) -> T
where
    T: PartialOrd + Copy + std::fmt::Debug,
{
    if value < min || value > max {
        log::warn!(
            "Setting `{}` = {:?} is out of range {:?}..={:?}; clamping",
            name,
            value,
            min,
            max
        );

        if value < min {
            min
        } else {
            max
        }
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HitDistanceReconstruction;

    #[test]
    fn kernel_names() {
        assert_eq!(
            "relax_diffuse_prepass",
            kernel_name("relax_diffuse", "prepass", Permutation::default())
        );

        let permutation = Permutation {
            performance_mode: true,
            checkerboard: true,
            confidence_inputs: true,
            hit_distance_reconstruction: HitDistanceReconstruction::Area5x5,
            history_reset: true,
        };

        assert_eq!(
            "a_b_perf_cb_conf_5x5_reset",
            kernel_name("a", "b", permutation)
        );
    }

    #[test]
    fn every_permutation_has_its_own_kernel() {
        let mut names: Vec<_> = Permutation::all()
            .map(|permutation| kernel_name("a", "b", permutation))
            .collect();

        names.sort();
        names.dedup();

        assert_eq!(Permutation::all().count(), names.len());
    }

    #[test]
    fn clamping() {
        assert_eq!(5, clamp_setting("x", 5, 2, 8));
        assert_eq!(2, clamp_setting("x", 0, 2, 8));
        assert_eq!(8.0, clamp_setting("x", 10.0, 0.0, 8.0));
    }

    #[test]
    fn support_follows_features() {
        let denoisers = [
            Denoiser::Reference,
            Denoiser::SigmaShadow,
            Denoiser::ReblurDiffuse,
            Denoiser::ReblurSpecular,
            Denoiser::ReblurDiffuseSpecular,
            Denoiser::RelaxDiffuse,
            Denoiser::RelaxSpecular,
            Denoiser::RelaxDiffuseSpecular,
        ];

        for denoiser in denoisers {
            match denoiser.family() {
                Ok(family) => {
                    assert!(denoiser.is_supported());
                    assert_eq!(denoiser.name(), family.name());
                }

                Err(err) => {
                    assert!(!denoiser.is_supported());

                    assert!(matches!(
                        err,
                        Error::UnsupportedDenoiser(name)
                            if name == denoiser.name()
                    ));
                }
            }
        }
    }
}
