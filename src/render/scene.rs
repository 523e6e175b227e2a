use serde::ser::SerializeStruct;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Transform {
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::default(),
            scale: Vec3::splat(1.0),
            rotation: Vec3::default(),
        }
    }
}

/// Colour in HSL: hue in degrees, saturation and lightness in percent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    pub fn new(h: f32, s: f32, l: f32) -> Self {
        Self { h, s, l }
    }

    pub fn to_rgb(&self) -> [u8; 3] {
        let h = self.h.rem_euclid(360.0) / 360.0;
        let s = (self.s / 100.0).clamp(0.0, 1.0);
        let l = (self.l / 100.0).clamp(0.0, 1.0);

        if s == 0.0 {
            let v = (l * 255.0).round() as u8;
            return [v, v, v];
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        let channel = |t: f32| {
            let t = t.rem_euclid(1.0);
            let v = if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            };
            (v * 255.0).round() as u8
        };

        [channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0)]
    }

    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.to_rgb();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

impl Serialize for Hsl {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Hsl", 4)?;
        s.serialize_field("h", &self.h)?;
        s.serialize_field("s", &self.s)?;
        s.serialize_field("l", &self.l)?;
        s.serialize_field("hex", &self.to_hex())?;
        s.end()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bar {
    pub index: usize,
    pub transform: Transform,
    pub color: Hsl,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CenterSphere {
    pub radius: f32,
    pub emissive_intensity: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Ring {
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub emissive_intensity: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Hsl,
    pub intensity: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RootGroup {
    pub rotation: Vec3,
}

/// Every visual primitive of one visualization session. The set is fixed at
/// construction; frames only change transform and material values.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Scene {
    pub group: RootGroup,
    pub sphere: CenterSphere,
    pub ring: Ring,
    pub lights: [PointLight; 2],
    pub bars: Vec<Bar>,
}

impl Scene {
    pub fn new(bar_count: usize) -> Self {
        let bars = (0..bar_count)
            .map(|index| Bar {
                index,
                transform: Transform::default(),
                color: Hsl::new(0.0, 50.0, 30.0),
            })
            .collect();

        Self {
            group: RootGroup::default(),
            sphere: CenterSphere {
                radius: 0.5,
                emissive_intensity: 0.0,
            },
            ring: Ring {
                inner_radius: 3.0,
                outer_radius: 3.2,
                emissive_intensity: 0.0,
            },
            lights: [
                PointLight {
                    position: Vec3::new(5.0, 5.0, 5.0),
                    color: Hsl::new(300.0, 100.0, 50.0),
                    intensity: 1.0,
                },
                PointLight {
                    position: Vec3::new(-5.0, -5.0, 5.0),
                    color: Hsl::new(180.0, 100.0, 50.0),
                    intensity: 1.0,
                },
            ],
            bars,
        }
    }
}
