//! Abstract animation clocks
//!
//! The simulation never touches textures. It only tracks which animation a
//! fighter is in and how far it has progressed; a renderer maps
//! `(animation, frame)` onto its own frame sequence.

use super::Animation;

/// Frame count and playback speed of one animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSpec {
    pub frames: u32,
    /// Frames advanced per unit of tick delta
    pub speed: f32,
    pub looping: bool,
}

impl AnimationSpec {
    pub const fn new(frames: u32, speed: f32, looping: bool) -> Self {
        Self {
            frames,
            speed,
            looping,
        }
    }

    pub fn last_frame(&self) -> u32 {
        self.frames.saturating_sub(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationTable {
    pub idle: AnimationSpec,
    pub run: AnimationSpec,
    pub attack: AnimationSpec,
    pub die: AnimationSpec,
}

impl Default for AnimationTable {
    fn default() -> Self {
        Self {
            idle: AnimationSpec::new(6, 0.2, true),
            run: AnimationSpec::new(7, 0.4, true),
            attack: AnimationSpec::new(8, 0.15, false),
            die: AnimationSpec::new(7, 0.2, false),
        }
    }
}

impl AnimationTable {
    /// `Dead` shares the `Die` sequence
    pub fn spec(&self, animation: Animation) -> AnimationSpec {
        match animation {
            Animation::Idle => self.idle,
            Animation::Run => self.run,
            Animation::Attack => self.attack,
            Animation::Die | Animation::Dead => self.die,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationClock {
    animation: Animation,
    position: f32,
}

impl AnimationClock {
    pub fn new(animation: Animation) -> Self {
        Self {
            animation,
            position: 0.0,
        }
    }

    pub fn animation(&self) -> Animation {
        self.animation
    }

    /// Switch animation, restarting from the first frame
    pub fn play(&mut self, animation: Animation) {
        self.animation = animation;
        self.position = 0.0;
    }

    pub fn frame(&self, table: &AnimationTable) -> u32 {
        let spec = table.spec(self.animation);
        if self.animation == Animation::Dead {
            return spec.last_frame();
        }
        (self.position.max(0.0).floor() as u32).min(spec.last_frame())
    }

    pub fn advance(&mut self, table: &AnimationTable, delta: f32) {
        if self.animation == Animation::Dead {
            return;
        }
        let spec = table.spec(self.animation);
        let next = self.position + spec.speed * delta;
        self.position = if spec.looping {
            next % spec.frames.max(1) as f32
        } else {
            next.min(spec.last_frame() as f32)
        };
    }

    /// True once a non-looping animation sits on its last frame
    pub fn is_finished(&self, table: &AnimationTable) -> bool {
        let spec = table.spec(self.animation);
        !spec.looping && self.frame(table) >= spec.last_frame()
    }
}
