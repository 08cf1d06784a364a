use hush_gpu::FrameIndex;
use log::{trace, warn};

use crate::ResourceRef;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PairId(u16);

impl PairId {
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

/// Meaning of a double-buffered texture within the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Texture written this frame
    Curr,

    /// Texture written during the previous frame
    Prev,
}

/// Pair of permanent textures that exist in two similar versions swapped
/// after each frame, so that history can be read and written without
/// copying.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DoubleBuffered {
    id: PairId,
}

impl DoubleBuffered {
    pub fn id(&self) -> PairId {
        self.id
    }

    pub fn curr(&self) -> ResourceRef {
        ResourceRef::History(self.id, Role::Curr)
    }

    pub fn prev(&self) -> ResourceRef {
        ResourceRef::History(self.id, Role::Prev)
    }
}

/// Physical texture of a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    fn swapped(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

#[derive(Clone, Debug)]
struct Pair {
    /// Local permanent-pool indices of slots A and B
    slots: [u16; 2],
    curr: Slot,
}

/// Keeps track of which texture of each pair is the current one.
#[derive(Clone, Debug, Default)]
pub struct PingPong {
    pairs: Vec<Pair>,
    frame: Option<FrameIndex>,
}

impl PingPong {
    pub(crate) fn add(&mut self, a: u16, b: u16) -> DoubleBuffered {
        let id = PairId(self.pairs.len() as u16);

        self.pairs.push(Pair {
            slots: [a, b],
            curr: Slot::A,
        });

        DoubleBuffered { id }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub(crate) fn contains(&self, pair: PairId) -> bool {
        pair.get() < self.pairs.len()
    }

    /// Notifies the tracker about a frame being denoised; swaps every pair if
    /// `frame` is newer than the last observed one, unless the history is
    /// being reset.
    ///
    /// A frame older than the last observed one (e.g. a restarted frame
    /// counter) becomes the new baseline without swapping.
    ///
    /// Returns whether the pairs got swapped.
    pub fn observe(&mut self, frame: FrameIndex, reset: bool) -> bool {
        let Some(last) = self.frame else {
            self.frame = Some(frame);
            return false;
        };

        if frame == last {
            return false;
        }

        self.frame = Some(frame);

        if frame < last {
            warn!(
                "Frame index went backwards ({} -> {}); treating it as the \
                 new baseline",
                last.get(),
                frame.get()
            );

            return false;
        }

        if reset {
            trace!("History reset at frame {}; not swapping", frame.get());
            return false;
        }

        for pair in &mut self.pairs {
            pair.curr = pair.curr.swapped();
        }

        true
    }

    pub fn current(&self, pair: PairId) -> Slot {
        self.pairs[pair.get()].curr
    }

    /// Returns the local permanent-pool index that given role of given pair
    /// points at this frame.
    pub fn resolve(&self, pair: PairId, role: Role) -> u16 {
        let pair = &self.pairs[pair.get()];

        let slot = match role {
            Role::Curr => pair.curr,
            Role::Prev => pair.curr.swapped(),
        };

        match slot {
            Slot::A => pair.slots[0],
            Slot::B => pair.slots[1],
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::*;

    fn frame(id: u32) -> FrameIndex {
        FrameIndex::new(id)
    }

    #[test]
    fn alternation() {
        let mut target = PingPong::default();
        let pair = target.add(3, 7).id();
        let mut slots = Vec::new();

        for id in 1..=4 {
            target.observe(frame(id), false);
            slots.push(target.current(pair));
        }

        assert_eq!(vec![Slot::A, Slot::B, Slot::A, Slot::B], slots);
    }

    #[test]
    fn same_frame_is_idempotent() {
        let mut target = PingPong::default();
        let pair = target.add(0, 1);

        target.observe(frame(1), false);
        assert!(target.observe(frame(2), false));
        assert!(!target.observe(frame(2), false));
        assert_eq!(Slot::B, target.current(pair.id()));
    }

    #[test]
    fn reset_suppresses_swap() {
        let mut target = PingPong::default();
        let pair = target.add(0, 1).id();

        target.observe(frame(1), false);
        target.observe(frame(2), false);

        let before = target.current(pair);

        assert!(!target.observe(frame(3), true));
        assert_eq!(before, target.current(pair));

        assert!(target.observe(frame(4), false));
        assert_ne!(before, target.current(pair));
    }

    #[test]
    fn going_backwards_restarts_the_baseline() {
        let mut target = PingPong::default();
        let pair = target.add(0, 1).id();

        target.observe(frame(10), false);
        target.observe(frame(11), false);

        assert!(!target.observe(frame(5), false));
        assert!(!target.observe(frame(5), false));
        assert_eq!(Slot::B, target.current(pair));

        assert!(target.observe(frame(6), false));
        assert_eq!(Slot::A, target.current(pair));

        assert!(target.observe(frame(7), false));
        assert_eq!(Slot::B, target.current(pair));
    }

    #[test]
    fn resolve() {
        let mut target = PingPong::default();
        let pair = target.add(3, 7).id();

        target.observe(frame(1), false);
        assert_eq!(3, target.resolve(pair, Role::Curr));
        assert_eq!(7, target.resolve(pair, Role::Prev));

        target.observe(frame(2), false);
        assert_eq!(7, target.resolve(pair, Role::Curr));
        assert_eq!(3, target.resolve(pair, Role::Prev));
    }

    #[test]
    fn random_sequences() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1234);

        for _ in 0..64 {
            let mut target = PingPong::default();
            let pairs = [target.add(0, 1).id(), target.add(2, 3).id()];
            let mut id = 0;
            let mut expected_swaps = 0;

            target.observe(frame(id), false);

            for _ in 0..128 {
                let advance = rng.gen_bool(0.7);
                let reset = rng.gen_bool(0.2);

                if advance {
                    id += rng.gen_range(1..4);

                    if !reset {
                        expected_swaps += 1;
                    }
                }

                target.observe(frame(id), reset);
            }

            let expected = if expected_swaps % 2 == 0 {
                Slot::A
            } else {
                Slot::B
            };

            for pair in pairs {
                assert_eq!(expected, target.current(pair));
            }
        }
    }
}
