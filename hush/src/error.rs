use crate::{Identifier, Permutation, ResourceRef, TextureDesc};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("denoiser `{0}` is not supported by this build")]
    UnsupportedDenoiser(&'static str),

    #[error("denoiser identifier {0:?} is used more than once")]
    DuplicateIdentifier(Identifier),

    #[error("denoiser identifier {0:?} does not exist")]
    UnknownIdentifier(Identifier),

    #[error("invalid render size: {width}x{height}")]
    InvalidRenderSize { width: u16, height: u16 },

    #[error(
        "settings of `{denoiser}` are {expected} bytes long, got {actual} bytes"
    )]
    SettingsSizeMismatch {
        denoiser: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error(
        "resource {resource:?} is already declared as {existing:?}, \
         got {requested:?}"
    )]
    ResourceMismatch {
        resource: ResourceRef,
        existing: TextureDesc,
        requested: TextureDesc,
    },

    #[error("resource {0:?} is referenced, but never declared")]
    UndeclaredResource(ResourceRef),

    #[error("resource {0:?} cannot be declared explicitly")]
    UndeclarableResource(ResourceRef),

    #[error("pass `{pass}` has {actual} out of {expected} permutations")]
    MissingPermutations {
        pass: String,
        expected: usize,
        actual: usize,
    },

    #[error("pass `{pass}` registers permutation {permutation:?} twice")]
    DuplicatePermutation {
        pass: String,
        permutation: Permutation,
    },

    #[error(
        "pass `{pass}` registers permutation {permutation:?} that varies over \
         axes the pass does not declare"
    )]
    UnexpectedPermutation {
        pass: String,
        permutation: Permutation,
    },

    #[error("pass `{pass}` classifies tiles, but is not the first pass")]
    MisplacedTileClassification { pass: String },

    #[error("pass `{pass}` classifies tiles, but declares permutation axes")]
    PermutedTileClassification { pass: String },

    #[error("pass `{pass}` is a second split-screen pass")]
    DuplicateSplitScreen { pass: String },

    #[error(
        "kernel `{kernel}` is registered twice with different resource ranges"
    )]
    PipelineMismatch { kernel: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
