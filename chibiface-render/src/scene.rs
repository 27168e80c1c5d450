//! Software viewport renderer: orbit camera plus per-pixel ray
//! intersection of the avatar's analytic parts.
//!
//! Each frame the rig is intersected against one primary ray per pixel,
//! the nearest hit is shaded with a hemisphere light and two directional
//! lights, and the face texture is mapped onto the front of the head
//! sphere. Rows render in parallel.

use rayon::prelude::*;

use chibiface_core::Rgb;

use crate::avatar::{AvatarFrame, HeadPose, MaterialSet, Part, Slot};
use crate::buffer::PixelBuffer;
use crate::math::Vec3;

// ---------------------------------------------------------------------------
// Orbit camera
// ---------------------------------------------------------------------------

const DEFAULT_EYE: Vec3 = Vec3::new(1.8, 1.7, 2.8);
const ORBIT_TARGET: Vec3 = Vec3::new(0.0, 0.9, 0.0);

/// Vertical field of view in radians.
const FOV_Y: f32 = std::f32::consts::FRAC_PI_4;

/// A yaw/pitch/distance camera orbiting the avatar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    /// Rotation around +y, radians; 0 looks down -z.
    pub yaw: f32,
    /// Elevation above the horizontal plane, radians.
    pub pitch: f32,
    pub distance: f32,
    pub target: Vec3,
}

impl OrbitCamera {
    pub const MIN_DISTANCE: f32 = 1.2;
    pub const MAX_DISTANCE: f32 = 4.2;
    /// Keep the camera above the ground plane (polar angle ≤ 0.49π).
    pub const MIN_PITCH: f32 = 0.01 * std::f32::consts::PI;
    pub const MAX_PITCH: f32 = 1.47;

    /// Rotate by pixel-derived deltas (radians).
    pub fn orbit(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw += d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(Self::MIN_PITCH, Self::MAX_PITCH);
    }

    /// Multiply the orbit distance, clamped to the dolly range.
    pub fn zoom(&mut self, factor: f32) {
        self.distance = (self.distance * factor).clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE);
    }

    /// Restore the initial pose.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Camera position in scene space.
    pub fn eye(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + Vec3::new(cp * sy, sp, cp * cy) * self.distance
    }

    /// Orthonormal view basis: (forward, right, up).
    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.target - self.eye()).normalized();
        let right = forward.cross(Vec3::new(0.0, 1.0, 0.0)).normalized();
        let up = right.cross(forward);
        (forward, right, up)
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        let offset = DEFAULT_EYE - ORBIT_TARGET;
        let distance = offset.length();
        Self {
            yaw: offset.x.atan2(offset.z),
            pitch: (offset.y / distance).asin(),
            distance,
            target: ORBIT_TARGET,
        }
    }
}

// ---------------------------------------------------------------------------
// Lights and fixed scene colors
// ---------------------------------------------------------------------------

const HEMI_SKY: Rgb = Rgb::from_hex(0xd7e7ff);
const HEMI_GROUND: Rgb = Rgb::from_hex(0x0b121d);
const HEMI_INTENSITY: f32 = 0.6;

const KEY_COLOR: Rgb = Rgb::from_hex(0xffffff);
const KEY_INTENSITY: f32 = 0.9;

const FILL_COLOR: Rgb = Rgb::from_hex(0x68f0c2);
const FILL_INTENSITY: f32 = 0.3;

const GROUND_COLOR: Rgb = Rgb::from_hex(0x0d1726);
const GROUND_RADIUS: f32 = 4.0;

const BG_TOP: Rgb = Rgb::from_hex(0x18223a);
const BG_BOTTOM: Rgb = Rgb::from_hex(0x0b1322);

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Surface {
    Part(Slot),
    Ground,
}

struct Hit {
    t: f32,
    point: Vec3,
    normal: Vec3,
    surface: Surface,
}

/// Render one frame of the avatar scene into `target`.
///
/// `face` is the masked face texture, alpha-blended onto the front of the
/// head sphere.
pub fn render_scene(
    target: &mut PixelBuffer,
    frame: &AvatarFrame,
    materials: &MaterialSet,
    face: &PixelBuffer,
    camera: &OrbitCamera,
) {
    let width = target.width;
    let height = target.height;
    if width == 0 || height == 0 {
        return;
    }

    let eye = camera.eye();
    let (forward, right, up) = camera.basis();
    let tan_half = (FOV_Y * 0.5).tan();
    let aspect = width as f32 / height as f32;

    let key_dir = Vec3::new(4.0, 6.0, 3.0).normalized();
    let fill_dir = Vec3::new(-2.5, 2.5, 1.5).normalized();

    target
        .pixels
        .par_chunks_mut(width as usize * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let ndc_y = 1.0 - 2.0 * (y as f32 + 0.5) / height as f32;
            let bg = BG_TOP.lerp(BG_BOTTOM, y as f32 / (height - 1).max(1) as f32);
            let bg8 = bg.to_rgb8();

            for (x, texel) in row.chunks_exact_mut(4).enumerate() {
                let ndc_x = 2.0 * (x as f32 + 0.5) / width as f32 - 1.0;
                let dir = (forward
                    + right * (ndc_x * tan_half * aspect)
                    + up * (ndc_y * tan_half))
                    .normalized();

                let rgb = match trace(eye, dir, frame) {
                    Some(hit) => {
                        shade(&hit, frame, materials, face, key_dir, fill_dir).to_rgb8()
                    }
                    None => bg8,
                };
                texel[0] = rgb[0];
                texel[1] = rgb[1];
                texel[2] = rgb[2];
                texel[3] = 255;
            }
        });
}

/// Nearest intersection of a ray with the rig and the ground disc.
fn trace(origin: Vec3, dir: Vec3, frame: &AvatarFrame) -> Option<Hit> {
    let mut best: Option<Hit> = None;

    for part in &frame.parts {
        let candidate = match *part {
            Part::Sphere {
                center,
                radius,
                slot,
            } => intersect_sphere(origin, dir, center, radius)
                .map(|t| sphere_hit(origin, dir, t, center, slot)),
            Part::Capsule { a, b, radius, slot } => {
                intersect_capsule(origin, dir, a, b, radius).map(|(t, normal)| Hit {
                    t,
                    point: origin + dir * t,
                    normal,
                    surface: Surface::Part(slot),
                })
            }
            Part::Ellipsoid {
                center,
                radii,
                slot,
            } => intersect_ellipsoid(origin, dir, center, radii).map(|(t, normal)| Hit {
                t,
                point: origin + dir * t,
                normal,
                surface: Surface::Part(slot),
            }),
            Part::Torus {
                center,
                major,
                minor,
                slot,
            } => intersect_torus(origin, dir, center, major, minor).map(|(t, normal)| Hit {
                t,
                point: origin + dir * t,
                normal,
                surface: Surface::Part(slot),
            }),
        };
        if let Some(hit) = candidate {
            if best.as_ref().map_or(true, |b| hit.t < b.t) {
                best = Some(hit);
            }
        }
    }

    // Ground disc at y = 0.
    if dir.y < -1e-6 {
        let t = -origin.y / dir.y;
        if t > 1e-4 {
            let point = origin + dir * t;
            if point.x * point.x + point.z * point.z <= GROUND_RADIUS * GROUND_RADIUS
                && best.as_ref().map_or(true, |b| t < b.t)
            {
                best = Some(Hit {
                    t,
                    point,
                    normal: Vec3::new(0.0, 1.0, 0.0),
                    surface: Surface::Ground,
                });
            }
        }
    }

    best
}

fn shade(
    hit: &Hit,
    frame: &AvatarFrame,
    materials: &MaterialSet,
    face: &PixelBuffer,
    key_dir: Vec3,
    fill_dir: Vec3,
) -> Rgb {
    let mut albedo = match hit.surface {
        Surface::Part(slot) => materials.color(slot),
        Surface::Ground => GROUND_COLOR,
    };

    // Face patch: blend the texture over the skin base on the front of the
    // head sphere.
    if let Surface::Part(Slot::HeadBase) = hit.surface {
        if let Some((tex, alpha)) = sample_face(&frame.head, hit.point, face) {
            albedo = albedo.lerp(tex, alpha);
        }
    }

    let n = hit.normal;

    // Hemisphere ambient blends ground to sky by the normal's upness.
    let hemi_t = (n.y + 1.0) * 0.5;
    let hemi = HEMI_GROUND.lerp(HEMI_SKY, hemi_t);

    let key = key_dir.dot(n).max(0.0) * KEY_INTENSITY;
    let fill = fill_dir.dot(n).max(0.0) * FILL_INTENSITY;

    let mut lit = Rgb::new(
        albedo.r * (hemi.r * HEMI_INTENSITY + KEY_COLOR.r * key + FILL_COLOR.r * fill),
        albedo.g * (hemi.g * HEMI_INTENSITY + KEY_COLOR.g * key + FILL_COLOR.g * fill),
        albedo.b * (hemi.b * HEMI_INTENSITY + KEY_COLOR.b * key + FILL_COLOR.b * fill),
    );

    // Soft contact shadow under the character.
    if let Surface::Ground = hit.surface {
        let d = (hit.point.x * hit.point.x + hit.point.z * hit.point.z).sqrt() / 0.85;
        let s = d.min(1.0);
        let shadow = 0.35 + 0.65 * s * s * (3.0 - 2.0 * s);
        lit = Rgb::new(lit.r * shadow, lit.g * shadow, lit.b * shadow);
    }

    lit
}

/// Sample the face texture for a hit point on the head sphere.
///
/// Projects the surface direction into the head's front-facing frame (the
/// sway yaw rotates around +y). Returns the texture color and its alpha;
/// the texture's own radial mask keeps the patch edge soft.
fn sample_face(head: &HeadPose, point: Vec3, face: &PixelBuffer) -> Option<(Rgb, f32)> {
    if face.width == 0 || face.height == 0 {
        return None;
    }
    let d = (point - head.center) * (1.0 / head.radius);

    let (sy, cy) = head.yaw.sin_cos();
    let front = Vec3::new(sy, 0.0, cy);
    let right = Vec3::new(cy, 0.0, -sy);

    // Back of the head keeps the plain skin material.
    if d.dot(front) < 0.12 {
        return None;
    }

    let u = 0.5 + d.dot(right) * 0.62;
    let v = 0.5 - (d.y - 0.08) * 0.72;
    if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
        return None;
    }

    let s = face.sample_bilinear(
        u as f64 * (face.width - 1) as f64,
        v as f64 * (face.height - 1) as f64,
    );
    let alpha = s[3] / 255.0;
    if alpha <= 0.0 {
        return None;
    }
    Some((
        Rgb::new(s[0] / 255.0, s[1] / 255.0, s[2] / 255.0),
        alpha,
    ))
}

// ---------------------------------------------------------------------------
// Primitive intersections
// ---------------------------------------------------------------------------

const T_MIN: f32 = 1e-4;

fn intersect_sphere(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_sq() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let t = -b - sq;
    if t > T_MIN {
        return Some(t);
    }
    let t = -b + sq;
    (t > T_MIN).then_some(t)
}

fn sphere_hit(origin: Vec3, dir: Vec3, t: f32, center: Vec3, slot: Slot) -> Hit {
    let point = origin + dir * t;
    Hit {
        t,
        point,
        normal: (point - center).normalized(),
        surface: Surface::Part(slot),
    }
}

fn intersect_ellipsoid(
    origin: Vec3,
    dir: Vec3,
    center: Vec3,
    radii: Vec3,
) -> Option<(f32, Vec3)> {
    // Scale to unit-sphere space.
    let o = origin - center;
    let o = Vec3::new(o.x / radii.x, o.y / radii.y, o.z / radii.z);
    let d = Vec3::new(dir.x / radii.x, dir.y / radii.y, dir.z / radii.z);

    let a = d.length_sq();
    let b = o.dot(d);
    let c = o.length_sq() - 1.0;
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let mut t = (-b - sq) / a;
    if t <= T_MIN {
        t = (-b + sq) / a;
        if t <= T_MIN {
            return None;
        }
    }
    let point = origin + dir * t;
    let local = point - center;
    let normal = Vec3::new(
        local.x / (radii.x * radii.x),
        local.y / (radii.y * radii.y),
        local.z / (radii.z * radii.z),
    )
    .normalized();
    Some((t, normal))
}

fn intersect_capsule(
    origin: Vec3,
    dir: Vec3,
    a: Vec3,
    b: Vec3,
    radius: f32,
) -> Option<(f32, Vec3)> {
    let ba = b - a;
    let oa = origin - a;

    let baba = ba.length_sq();
    let bard = ba.dot(dir);
    let baoa = ba.dot(oa);
    let rdoa = dir.dot(oa);
    let oaoa = oa.length_sq();

    let qa = baba - bard * bard;
    let qb = baba * rdoa - baoa * bard;
    let qc = baba * oaoa - baoa * baoa - radius * radius * baba;
    let h = qb * qb - qa * qc;
    if h < 0.0 {
        return None;
    }

    // Rays parallel to the axis degenerate the cylinder quadratic
    // (`qa == 0`); they can only hit the end caps.
    let mut t = if qa > 1e-8 {
        (-qb - h.sqrt()) / qa
    } else {
        f32::NEG_INFINITY
    };
    let y = baoa + t * bard;
    if y < 0.0 || y > baba {
        // End caps.
        let oc = if y <= 0.0 { oa } else { origin - b };
        let cb = oc.dot(dir);
        let cc = oc.length_sq() - radius * radius;
        let ch = cb * cb - cc;
        if ch < 0.0 {
            return None;
        }
        t = -cb - ch.sqrt();
    }
    if t <= T_MIN {
        return None;
    }

    let point = origin + dir * t;
    let pa = point - a;
    let along = (pa.dot(ba) / baba).clamp(0.0, 1.0);
    let normal = (pa - ba * along) * (1.0 / radius);
    Some((t, normal.normalized()))
}

/// Sphere-traced torus in the XZ plane around `center`.
///
/// A quartic solve is overkill for one collar; marching the torus SDF
/// inside its bounding sphere converges in a handful of steps.
fn intersect_torus(
    origin: Vec3,
    dir: Vec3,
    center: Vec3,
    major: f32,
    minor: f32,
) -> Option<(f32, Vec3)> {
    let bound = major + minor;
    let enter = intersect_sphere(origin, dir, center, bound)?;

    let sdf = |p: Vec3| -> f32 {
        let q = p - center;
        let ring = (q.x * q.x + q.z * q.z).sqrt() - major;
        (ring * ring + q.y * q.y).sqrt() - minor
    };

    let mut t = enter;
    for _ in 0..64 {
        let p = origin + dir * t;
        let d = sdf(p);
        if d < 1e-4 {
            // Central-difference normal.
            let e = 1e-3;
            let normal = Vec3::new(
                sdf(p + Vec3::new(e, 0.0, 0.0)) - sdf(p - Vec3::new(e, 0.0, 0.0)),
                sdf(p + Vec3::new(0.0, e, 0.0)) - sdf(p - Vec3::new(0.0, e, 0.0)),
                sdf(p + Vec3::new(0.0, 0.0, e)) - sdf(p - Vec3::new(0.0, 0.0, e)),
            )
            .normalized();
            return Some((t, normal));
        }
        t += d;
        if t > enter + 2.0 * bound {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::pose_at;
    use crate::compositor::FaceCompositor;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn default_camera_matches_initial_pose() {
        let eye = OrbitCamera::default().eye();
        assert!((eye.x - 1.8).abs() < EPSILON);
        assert!((eye.y - 1.7).abs() < EPSILON);
        assert!((eye.z - 2.8).abs() < EPSILON);
    }

    #[test]
    fn zoom_clamps_to_dolly_range() {
        let mut cam = OrbitCamera::default();
        cam.zoom(100.0);
        assert_eq!(cam.distance, OrbitCamera::MAX_DISTANCE);
        cam.zoom(0.0001);
        assert_eq!(cam.distance, OrbitCamera::MIN_DISTANCE);
    }

    #[test]
    fn orbit_keeps_camera_above_ground() {
        let mut cam = OrbitCamera::default();
        cam.orbit(0.0, -10.0);
        assert_eq!(cam.pitch, OrbitCamera::MIN_PITCH);
        assert!(cam.eye().y > 0.0);
    }

    #[test]
    fn reset_restores_default() {
        let mut cam = OrbitCamera::default();
        cam.orbit(1.0, 0.3);
        cam.zoom(0.5);
        cam.reset();
        assert_eq!(cam, OrbitCamera::default());
    }

    #[test]
    fn sphere_intersection_from_outside() {
        let t = intersect_sphere(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::ZERO,
            1.0,
        )
        .unwrap();
        assert!((t - 4.0).abs() < EPSILON);
    }

    #[test]
    fn capsule_hits_like_cylinder_mid_segment() {
        let (t, normal) = intersect_capsule(
            Vec3::new(0.0, 0.5, 5.0),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            0.25,
        )
        .unwrap();
        assert!((t - 4.75).abs() < EPSILON);
        assert!((normal.z - 1.0).abs() < 1e-3);
    }

    #[test]
    fn capsule_handles_axis_parallel_rays() {
        // Straight down the axis: the cylinder quadratic degenerates and
        // only the end cap can be hit.
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        let (t, normal) = intersect_capsule(
            Vec3::new(0.0, 5.0, 0.1),
            Vec3::new(0.0, -1.0, 0.0),
            a,
            b,
            0.25,
        )
        .unwrap();
        assert!(t.is_finite());
        // Lands on the upper cap sphere: y = 1 + sqrt(r^2 - 0.1^2).
        let hit_y = 5.0 - t;
        assert!((hit_y - (1.0 + (0.25f32 * 0.25 - 0.01).sqrt())).abs() < 1e-3);
        assert!(normal.y > 0.0);

        // Parallel but outside the radius: clean miss, no NaN hit.
        assert!(intersect_capsule(
            Vec3::new(0.5, 5.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            a,
            b,
            0.25,
        )
        .is_none());
    }

    #[test]
    fn torus_hit_on_outer_ring() {
        let hit = intersect_torus(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::ZERO,
            1.0,
            0.1,
        );
        let (t, _) = hit.unwrap();
        assert!((t - (5.0 - 1.1)).abs() < 0.01);
    }

    #[test]
    fn render_covers_avatar_ground_and_background() {
        let mut target = PixelBuffer::new(96, 72);
        let frame = pose_at(0.0);
        let materials = MaterialSet::default();
        let face = FaceCompositor::with_size(8).unwrap();
        let camera = OrbitCamera::default();

        render_scene(&mut target, &frame, &materials, face.buffer(), &camera);

        // Fully opaque output.
        assert!(target.pixels.chunks_exact(4).all(|p| p[3] == 255));

        // Centre ray passes near the orbit target and hits the avatar.
        let center = target.pixel(48, 36);
        let corner = target.pixel(0, 0);
        assert_ne!(&center[..3], &corner[..3]);

        // Top-left corner is the background gradient's first row.
        assert_eq!(&corner[..3], &BG_TOP.to_rgb8());

        // The bottom-centre ray passes under the rig and lands on the
        // ground disc; the pixel there is lit ground, not background.
        let eye = camera.eye();
        let (forward, right, up) = camera.basis();
        let tan_half = (FOV_Y * 0.5).tan();
        let aspect = 96.0f32 / 72.0;
        let ndc_x = 2.0 * 48.5 / 96.0 - 1.0;
        let ndc_y = 1.0 - 2.0 * 71.5 / 72.0;
        let dir = (forward + right * (ndc_x * tan_half * aspect) + up * (ndc_y * tan_half))
            .normalized();
        let hit = trace(eye, dir, &frame).unwrap();
        assert!(matches!(hit.surface, Surface::Ground));
        assert!(hit.point.x.hypot(hit.point.z) < GROUND_RADIUS);
        assert_ne!(&target.pixel(48, 71)[..3], &BG_BOTTOM.to_rgb8());
    }

    #[test]
    fn contact_shadow_darkens_centre_ground() {
        let frame = pose_at(0.0);
        let materials = MaterialSet::default();
        let face = PixelBuffer::new(4, 4);
        let key_dir = Vec3::new(4.0, 6.0, 3.0).normalized();
        let fill_dir = Vec3::new(-2.5, 2.5, 1.5).normalized();

        let ground_hit = |x: f32| Hit {
            t: 1.0,
            point: Vec3::new(x, 0.0, 0.0),
            normal: Vec3::new(0.0, 1.0, 0.0),
            surface: Surface::Ground,
        };
        let near = shade(&ground_hit(0.3), &frame, &materials, &face, key_dir, fill_dir);
        let far = shade(&ground_hit(3.0), &frame, &materials, &face, key_dir, fill_dir);
        assert!(near.g < far.g, "ground under the rig should be darker");
    }

    #[test]
    fn render_is_deterministic() {
        let frame = pose_at(1.0);
        let materials = MaterialSet::default();
        let face = FaceCompositor::with_size(8).unwrap();
        let camera = OrbitCamera::default();

        let mut a = PixelBuffer::new(64, 48);
        let mut b = PixelBuffer::new(64, 48);
        render_scene(&mut a, &frame, &materials, face.buffer(), &camera);
        render_scene(&mut b, &frame, &materials, face.buffer(), &camera);
        assert_eq!(a.pixels, b.pixels);
    }
}
