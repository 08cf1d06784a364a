use std::fmt;

use bytemuck::Pod;
use glam::UVec2;
use hush_gpu::CommonConstants;

use crate::{
    Checkerboard, CommonSettings, ConstantWriter, GraphBuilder, Pass,
    Permutation, Result,
};

/// Denoising algorithm, described as a graph of passes.
///
/// Families are declared once, when an instance is created; afterwards they
/// only answer per-frame questions about which permutation to pick, how many
/// times to run a pass and what constants to give it.
pub trait Family: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the default settings, as bytes; their length determines how
    /// large settings of this family are.
    fn default_settings(&self) -> Vec<u8>;

    fn declare(&self, graph: &mut GraphBuilder<'_>) -> Result<()>;

    /// Selects kernel variants for the current frame; each pass looks only at
    /// the axes it has declared.
    fn permutation(&self, ctx: &FrameContext<'_>) -> Permutation;

    /// Returns how many times given pass should be dispatched this frame.
    fn repeat(&self, _pass: &Pass, _ctx: &FrameContext<'_>) -> Repeat {
        Repeat::once()
    }

    /// Writes constant data of given pass; must write exactly as many bytes
    /// as the pass' kernel has declared.
    fn pack(
        &self,
        pass: &Pass,
        iteration: u32,
        ctx: &FrameContext<'_>,
        out: &mut ConstantWriter,
    );
}

/// Everything a family can look at while assembling a frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext<'a> {
    pub common: &'a CommonSettings,
    pub constants: &'a CommonConstants,
    pub render_size: UVec2,
    pub rect_size: UVec2,
    settings: &'a [u8],
}

impl<'a> FrameContext<'a> {
    pub(crate) fn new(
        common: &'a CommonSettings,
        constants: &'a CommonConstants,
        render_size: UVec2,
        settings: &'a [u8],
    ) -> Self {
        Self {
            common,
            constants,
            render_size,
            rect_size: constants.rect_size.as_uvec2(),
            settings,
        }
    }

    /// Decodes settings of the current family.
    pub fn settings<S>(&self) -> S
    where
        S: Pod,
    {
        let settings = bytemuck::try_pod_read_unaligned(self.settings);

        debug_assert!(
            settings.is_ok(),
            "settings are {} bytes long, but {} were requested",
            self.settings.len(),
            std::mem::size_of::<S>(),
        );

        settings.unwrap_or_else(|_| S::zeroed())
    }

    pub fn is_history_reset(&self) -> bool {
        self.common.accumulation_mode.is_reset()
    }

    /// Returns the permutation implied by common settings alone.
    pub fn base_permutation(&self) -> Permutation {
        Permutation {
            confidence_inputs: self.common.is_history_confidence_available,
            history_reset: self.is_history_reset(),
            ..Default::default()
        }
    }

    pub fn common_constants(
        &self,
        checkerboard: Checkerboard,
    ) -> CommonConstants {
        CommonConstants {
            checkerboard: checkerboard.index() as u32,
            ..*self.constants
        }
    }
}

/// How many times a pass gets dispatched within a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repeat {
    pub count: u32,

    /// Shifts which iterations count as odd when picking alternating
    /// resources; iteration `i` uses the alternate resource when
    /// `(phase + i)` is odd
    pub phase: u32,
}

impl Repeat {
    pub fn once() -> Self {
        Self::times(1)
    }

    pub fn times(count: u32) -> Self {
        Self { count, phase: 0 }
    }

    pub fn skip() -> Self {
        Self::times(0)
    }

    pub fn with_phase(mut self, phase: u32) -> Self {
        self.phase = phase;
        self
    }

    pub fn is_odd(&self, iteration: u32) -> bool {
        (self.phase + iteration) % 2 == 1
    }
}

impl Default for Repeat {
    fn default() -> Self {
        Self::once()
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;

    use super::*;
    use crate::AccumulationMode;

    #[test]
    fn repeat_parity() {
        let target = Repeat::times(3);

        assert!(!target.is_odd(0));
        assert!(target.is_odd(1));
        assert!(!target.is_odd(2));

        let target = target.with_phase(1);

        assert!(target.is_odd(0));
        assert!(!target.is_odd(1));
    }

    #[test]
    fn settings() {
        #[repr(C)]
        #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
        struct Settings {
            a: u32,
            b: f32,
        }

        let common = CommonSettings::default();
        let constants = CommonConstants::default();

        let bytes = bytemuck::bytes_of(&Settings { a: 1, b: 2.0 }).to_vec();
        let target =
            FrameContext::new(&common, &constants, UVec2::ONE, &bytes);

        assert_eq!(Settings { a: 1, b: 2.0 }, target.settings());
    }

    #[test]
    fn base_permutation() {
        let common = CommonSettings {
            accumulation_mode: AccumulationMode::Restart,
            is_history_confidence_available: true,
            ..Default::default()
        };

        let constants = CommonConstants::default();
        let target = FrameContext::new(&common, &constants, UVec2::ONE, &[]);

        assert_eq!(
            Permutation {
                confidence_inputs: true,
                history_reset: true,
                ..Default::default()
            },
            target.base_permutation()
        );
    }
}
