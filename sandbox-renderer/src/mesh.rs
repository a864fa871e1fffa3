//! Fixed geometry for the WebGL backend: a 3x3x3 cube of colored cubies.

/// Edge length of one cubie.
pub const CUBIE_SIZE: f32 = 0.9;
/// Distance between neighbouring cubie centres.
pub const CUBIE_SPACING: f32 = 0.905;

/// Face colors in face order: front, back, top, bottom, left, right.
pub const FACE_COLORS: [[f32; 3]; 6] = [
    [0.105, 0.148, 0.308],
    [0.152, 0.273, 0.562],
    [0.639, 0.421, 0.656],
    [0.351, 0.042, 0.3],
    [0.628, 0.933, 0.542],
    [0.824, 0.378, 0.207],
];

/// Flat position and color arrays, three floats per vertex each.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColoredMesh {
    /// `x, y, z` per vertex.
    pub positions: Vec<f32>,
    /// `r, g, b` per vertex.
    pub colors: Vec<f32>,
}

impl ColoredMesh {
    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// Build the cube: 27 cubies x 6 faces x 2 triangles.
#[must_use]
pub fn rubik_cube() -> ColoredMesh {
    let mut mesh = ColoredMesh::default();
    for x in -1i8..=1 {
        for y in -1i8..=1 {
            for z in -1i8..=1 {
                let center = [
                    f32::from(x) * CUBIE_SPACING,
                    f32::from(y) * CUBIE_SPACING,
                    f32::from(z) * CUBIE_SPACING,
                ];
                for (face, color) in FACE_COLORS.iter().enumerate() {
                    for corner in face_corners(center, CUBIE_SIZE / 2.0, face) {
                        mesh.positions.extend_from_slice(&corner);
                        mesh.colors.extend_from_slice(color);
                    }
                }
            }
        }
    }
    mesh
}

/// Two triangles covering one face of a cubie.
fn face_corners(c: [f32; 3], h: f32, face: usize) -> [[f32; 3]; 6] {
    let [x, y, z] = c;
    // Corners (a, b, c, d) walk the face; triangles are (a, b, c) and (a, c, d).
    let [a, b, cc, d] = match face {
        0 => [[x - h, y - h, z + h], [x + h, y - h, z + h], [x + h, y + h, z + h], [x - h, y + h, z + h]],
        1 => [[x - h, y - h, z - h], [x + h, y - h, z - h], [x + h, y + h, z - h], [x - h, y + h, z - h]],
        2 => [[x - h, y + h, z - h], [x + h, y + h, z - h], [x + h, y + h, z + h], [x - h, y + h, z + h]],
        3 => [[x - h, y - h, z - h], [x + h, y - h, z - h], [x + h, y - h, z + h], [x - h, y - h, z + h]],
        4 => [[x - h, y - h, z - h], [x - h, y + h, z - h], [x - h, y + h, z + h], [x - h, y - h, z + h]],
        _ => [[x + h, y - h, z - h], [x + h, y + h, z - h], [x + h, y + h, z + h], [x + h, y - h, z + h]],
    };
    [a, b, cc, a, cc, d]
}
