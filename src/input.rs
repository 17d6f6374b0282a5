// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use std::collections::BTreeMap;

/// Stable identity of one contact. The mouse sorts ahead of every touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PointerId {
    Mouse,
    Touch(u64),
}

/// One active contact in aspect-corrected simulation space (y up).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerSample {
    pub id: PointerId,
    pub position: [f32; 2],
    /// Position minus the previous position. Zero until the first move.
    pub delta: [f32; 2],
}

/// Active contacts keyed by id. At most one entry per id.
#[derive(Clone, Debug, Default)]
pub struct Pointers {
    samples: BTreeMap<PointerId, PointerSample>,
}

impl Pointers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `id`. A repeated press restarts the contact.
    pub fn press(&mut self, id: PointerId, position: [f32; 2]) {
        self.samples.insert(
            id,
            PointerSample {
                id,
                position,
                delta: [0.0; 2],
            },
        );
    }

    /// Moves a tracked contact. Returns false when `id` is not pressed.
    pub fn move_to(&mut self, id: PointerId, position: [f32; 2]) -> bool {
        match self.samples.get_mut(&id) {
            Some(sample) => {
                sample.delta = [
                    position[0] - sample.position[0],
                    position[1] - sample.position[1],
                ];
                sample.position = position;
                true
            }
            None => false,
        }
    }

    pub fn release(&mut self, id: PointerId) {
        self.samples.remove(&id);
    }

    pub fn cancel(&mut self, id: PointerId) {
        self.release(id);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn is_pressed(&self, id: PointerId) -> bool {
        self.samples.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Snapshot ordered by id.
    pub fn samples(&self) -> Vec<PointerSample> {
        self.samples.values().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_press_move_release() {
        let mut pointers = Pointers::new();
        assert!(!pointers.move_to(PointerId::Mouse, [0.5, 0.5]));

        pointers.press(PointerId::Mouse, [0.5, 0.5]);
        assert_eq!(pointers.samples()[0].delta, [0.0, 0.0]);

        assert!(pointers.move_to(PointerId::Mouse, [0.75, 0.25]));
        let sample = pointers.samples()[0];
        assert_eq!(sample.position, [0.75, 0.25]);
        assert_eq!(sample.delta, [0.25, -0.25]);

        pointers.release(PointerId::Mouse);
        assert!(pointers.is_empty());
    }

    #[test]
    fn one_entry_per_id_ordered_by_id() {
        let mut pointers = Pointers::new();
        pointers.press(PointerId::Touch(9), [0.9, 0.0]);
        pointers.press(PointerId::Touch(2), [0.2, 0.0]);
        pointers.press(PointerId::Mouse, [0.0, 0.0]);
        pointers.press(PointerId::Touch(2), [0.3, 0.0]);

        let ids: Vec<_> = pointers.samples().iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec![PointerId::Mouse, PointerId::Touch(2), PointerId::Touch(9)]
        );
        assert_eq!(pointers.samples()[1].position, [0.3, 0.0]);
    }

    #[test]
    fn cancel_drops_only_that_contact() {
        let mut pointers = Pointers::new();
        pointers.press(PointerId::Touch(1), [0.1, 0.1]);
        pointers.press(PointerId::Touch(2), [0.2, 0.2]);
        pointers.cancel(PointerId::Touch(1));
        assert!(!pointers.is_pressed(PointerId::Touch(1)));
        assert!(pointers.is_pressed(PointerId::Touch(2)));
        assert_eq!(pointers.len(), 1);
    }
}
