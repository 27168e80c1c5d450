//! The chibi avatar rig: analytic body parts, material slots, and the idle
//! animation pose.

use chibiface_core::Rgb;

use crate::extract::FacePalette;
use crate::math::Vec3;

/// Named material slots recolored in place on every palette update.
///
/// The set is persistent: palette changes mutate the colors, they never
/// allocate a new set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialSet {
    pub head_base: Rgb,
    pub body: Rgb,
    pub limb: Rgb,
    pub accent: Rgb,
}

impl MaterialSet {
    /// Overwrite the slot colors from an extracted palette.
    pub fn apply_palette(&mut self, palette: &FacePalette) {
        self.head_base = palette.skin;
        self.body = palette.cloth;
        self.limb = palette.cloth.lerp(palette.skin, 0.25);
        self.accent = palette.accent;
    }

    #[inline]
    pub fn color(&self, slot: Slot) -> Rgb {
        match slot {
            Slot::HeadBase => self.head_base,
            Slot::Body => self.body,
            Slot::Limb => self.limb,
            Slot::Accent => self.accent,
        }
    }
}

impl Default for MaterialSet {
    fn default() -> Self {
        let mut set = Self {
            head_base: Rgb::new(0.0, 0.0, 0.0),
            body: Rgb::new(0.0, 0.0, 0.0),
            limb: Rgb::new(0.0, 0.0, 0.0),
            accent: Rgb::new(0.0, 0.0, 0.0),
        };
        set.apply_palette(&FacePalette::default());
        set
    }
}

/// Which material slot shades a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    HeadBase,
    Body,
    Limb,
    Accent,
}

/// An analytic body part, intersected per pixel by the scene renderer.
#[derive(Debug, Clone, Copy)]
pub enum Part {
    Sphere {
        center: Vec3,
        radius: f32,
        slot: Slot,
    },
    /// Capsule between two endpoints (arms and legs).
    Capsule {
        a: Vec3,
        b: Vec3,
        radius: f32,
        slot: Slot,
    },
    /// Axis-aligned ellipsoid (shoes).
    Ellipsoid {
        center: Vec3,
        radii: Vec3,
        slot: Slot,
    },
    /// Torus lying in the XZ plane (collar).
    Torus {
        center: Vec3,
        major: f32,
        minor: f32,
        slot: Slot,
    },
}

/// Head placement for the current frame; the renderer maps the face
/// texture onto the front of this sphere.
#[derive(Debug, Clone, Copy)]
pub struct HeadPose {
    pub center: Vec3,
    pub radius: f32,
    /// Face direction sway around +z, radians.
    pub yaw: f32,
}

/// The rig posed for one animation frame.
#[derive(Debug, Clone)]
pub struct AvatarFrame {
    pub parts: Vec<Part>,
    pub head: HeadPose,
}

const BODY_RADIUS: f32 = 0.6;
const HEAD_RADIUS: f32 = 0.6;
const LIMB_RADIUS: f32 = 0.12;
const LIMB_HALF_LEN: f32 = 0.06;

/// Build the rig posed at elapsed time `t` (seconds).
///
/// Idle cycle: whole-body bob, independent head bob and sway, opposed arm
/// and leg swings.
pub fn pose_at(t: f32) -> AvatarFrame {
    let bob = (t * 2.0).sin() * 0.02;
    let head_y = 1.3 + (t * 2.2).sin() * 0.03 + bob;
    let head_yaw = (t * 0.8).sin() * 0.08;

    let mut parts = Vec::with_capacity(9);

    // Round torso.
    parts.push(Part::Sphere {
        center: Vec3::new(0.0, 0.55 + bob, 0.0),
        radius: BODY_RADIUS,
        slot: Slot::Body,
    });

    // Head base; the textured face patch is handled by the renderer.
    parts.push(Part::Sphere {
        center: Vec3::new(0.0, head_y, 0.0),
        radius: HEAD_RADIUS,
        slot: Slot::HeadBase,
    });

    // Collar ring at the neck seam.
    parts.push(Part::Torus {
        center: Vec3::new(0.0, 0.98 + bob, 0.0),
        major: 0.48,
        minor: 0.05,
        slot: Slot::Accent,
    });

    // Arms: tilted capsules swinging in opposition.
    let arm_angle = std::f32::consts::PI / 2.6 + (t * 2.4).sin() * 0.25;
    parts.push(limb_capsule(
        Vec3::new(-0.55, 0.92 + bob, 0.1),
        tilt_z(arm_angle),
    ));
    parts.push(limb_capsule(
        Vec3::new(0.55, 0.92 + bob, 0.1),
        tilt_z(-arm_angle),
    ));

    // Legs: slight forward/back swing.
    let leg_angle = (t * 2.0).sin() * 0.12;
    parts.push(limb_capsule(
        Vec3::new(-0.18, 0.16 + bob, 0.06),
        tilt_x(leg_angle),
    ));
    parts.push(limb_capsule(
        Vec3::new(0.18, 0.16 + bob, 0.06),
        tilt_x(-leg_angle),
    ));

    // Shoes: flattened, forward-stretched ellipsoids.
    for side in [-1.0f32, 1.0] {
        parts.push(Part::Ellipsoid {
            center: Vec3::new(0.18 * side, 0.02 + bob, 0.16),
            radii: Vec3::new(0.192, 0.096, 0.16),
            slot: Slot::Accent,
        });
    }

    AvatarFrame {
        parts,
        head: HeadPose {
            center: Vec3::new(0.0, head_y, 0.0),
            radius: HEAD_RADIUS,
            yaw: head_yaw,
        },
    }
}

fn limb_capsule(center: Vec3, axis: Vec3) -> Part {
    Part::Capsule {
        a: center + axis * LIMB_HALF_LEN,
        b: center - axis * LIMB_HALF_LEN,
        radius: LIMB_RADIUS,
        slot: Slot::Limb,
    }
}

/// Unit +y axis tilted by `angle` around z.
fn tilt_z(angle: f32) -> Vec3 {
    Vec3::new(-angle.sin(), angle.cos(), 0.0)
}

/// Unit +y axis tilted by `angle` around x.
fn tilt_x(angle: f32) -> Vec3 {
    Vec3::new(0.0, angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{BASELINE_CLOTH, BASELINE_SKIN};

    #[test]
    fn rig_has_all_parts() {
        let frame = pose_at(0.0);
        // Body, head, collar, 2 arms, 2 legs, 2 shoes.
        assert_eq!(frame.parts.len(), 9);
    }

    #[test]
    fn head_bob_stays_in_range() {
        for i in 0..100 {
            let t = i as f32 * 0.13;
            let frame = pose_at(t);
            let y = frame.head.center.y;
            assert!((1.25..=1.35).contains(&y), "head y out of range: {y}");
            assert!(frame.head.yaw.abs() <= 0.08 + 1e-6);
        }
    }

    #[test]
    fn limbs_keep_length() {
        let frame = pose_at(1.7);
        for part in &frame.parts {
            if let Part::Capsule { a, b, .. } = part {
                let len = (*a - *b).length();
                assert!((len - 2.0 * LIMB_HALF_LEN).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn default_materials_match_baselines() {
        let m = MaterialSet::default();
        assert_eq!(m.head_base, BASELINE_SKIN);
        assert_eq!(m.body, BASELINE_CLOTH);
        assert_eq!(m.limb, BASELINE_CLOTH.lerp(BASELINE_SKIN, 0.25));
    }

    #[test]
    fn apply_palette_mutates_in_place() {
        let mut m = MaterialSet::default();
        let p = FacePalette {
            skin: Rgb::new(1.0, 0.0, 0.0),
            cloth: Rgb::new(0.0, 1.0, 0.0),
            accent: Rgb::new(0.0, 0.0, 1.0),
            shadow: Rgb::new(0.0, 0.0, 0.0),
        };
        m.apply_palette(&p);
        assert_eq!(m.head_base, p.skin);
        assert_eq!(m.body, p.cloth);
        assert_eq!(m.accent, p.accent);
        assert_eq!(m.limb, p.cloth.lerp(p.skin, 0.25));
    }
}
