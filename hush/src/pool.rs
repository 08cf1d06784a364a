use log::{debug, error};

use crate::TextureDesc;

/// How transient textures of different denoisers share the transient pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransientPolicy {
    /// Denoisers reuse each other's transient textures whenever descriptors
    /// match; the pool grows only by what no earlier denoiser provides.
    ///
    /// Requires that no denoiser reads a transient texture it hasn't written
    /// during the current frame; debug builds check it.
    #[default]
    Shared,

    /// Each denoiser gets its own transient textures.
    Isolated,
}

/// Textures of all denoisers of an instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourcePool {
    permanent: Vec<TextureDesc>,
    transient: Vec<TextureDesc>,
}

impl ResourcePool {
    pub fn permanent(&self) -> &[TextureDesc] {
        &self.permanent
    }

    pub fn transient(&self) -> &[TextureDesc] {
        &self.transient
    }

    /// Places textures of a single denoiser in the pool, returning where
    /// they landed.
    pub(crate) fn allocate(
        &mut self,
        denoiser: &str,
        permanent: &[TextureDesc],
        transient: &[TextureDesc],
        policy: TransientPolicy,
    ) -> PoolRegion {
        let permanent_base = self.permanent.len();

        self.permanent.extend_from_slice(permanent);

        let transient = match policy {
            TransientPolicy::Shared => {
                let mut claimed = vec![false; self.transient.len()];

                transient
                    .iter()
                    .map(|desc| {
                        let free = self.transient.iter().zip(&claimed).position(
                            |(existing, &claimed)| !claimed && existing == desc,
                        );

                        let idx = free.unwrap_or_else(|| {
                            self.transient.push(*desc);
                            claimed.push(false);
                            self.transient.len() - 1
                        });

                        claimed[idx] = true;
                        idx
                    })
                    .collect()
            }

            TransientPolicy::Isolated => {
                let base = self.transient.len();

                self.transient.extend_from_slice(transient);

                (base..self.transient.len()).collect()
            }
        };

        debug!(
            "Allocated pool region for `{}`: permanent {}..{}, transient {:?}",
            denoiser,
            permanent_base,
            self.permanent.len(),
            transient,
        );

        PoolRegion {
            permanent_base,
            permanent_len: permanent.len(),
            transient,
        }
    }
}

/// Maps local pool indices of a single denoiser into the instance's pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct PoolRegion {
    permanent_base: usize,
    permanent_len: usize,
    transient: Vec<usize>,
}

impl PoolRegion {
    pub fn permanent(&self, idx: u16) -> usize {
        debug_assert!((idx as usize) < self.permanent_len);

        self.permanent_base + idx as usize
    }

    pub fn permanent_range(&self) -> std::ops::Range<usize> {
        self.permanent_base..(self.permanent_base + self.permanent_len)
    }

    pub fn transient(&self, idx: u16) -> usize {
        self.transient[idx as usize]
    }

    #[cfg(test)]
    pub fn transients(&self) -> &[usize] {
        &self.transient
    }
}

/// Keeps track of who wrote each transient texture during the current frame
/// and reports reads of textures that weren't written by the reader.
///
/// Only checks anything in debug builds.
#[derive(Clone, Debug, Default)]
pub(crate) struct TransientArena {
    generation: u32,
    owners: Vec<Option<Owner>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Owner {
    denoiser: usize,
    generation: u32,
}

impl TransientArena {
    pub fn new(len: usize) -> Self {
        Self {
            generation: 0,
            owners: vec![None; len],
        }
    }

    /// Starts a new frame, invalidating everything written so far.
    pub fn begin_frame(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn write(&mut self, slot: usize, denoiser: usize) {
        if cfg!(debug_assertions) {
            self.owners[slot] = Some(Owner {
                denoiser,
                generation: self.generation,
            });
        }
    }

    /// Returns whether `denoiser` is allowed to read given slot.
    pub fn read(&self, slot: usize, denoiser: usize, pass: &str) -> bool {
        if !cfg!(debug_assertions) {
            return true;
        }

        let expected = Owner {
            denoiser,
            generation: self.generation,
        };

        if self.owners[slot] == Some(expected) {
            return true;
        }

        error!(
            "Pass `{}` of denoiser #{} reads transient texture #{}, which \
             it hasn't written this frame (owner: {:?})",
            pass, denoiser, slot, self.owners[slot],
        );

        debug_assert!(
            false,
            "transient texture #{slot} read before being written"
        );

        false
    }
}
