//! Polygon geometry.
//!
//! COCO stores polygon outlines as flat `[x0, y0, x1, y1, ...]` lists.
//! [`Polygon`] borrows such a list and reads it as consecutive vertices;
//! the outline is implicitly closed (the last vertex connects to the first).

/// A closed polygon over a flat coordinate list.
#[derive(Debug, Clone, Copy)]
pub struct Polygon<'a> {
    coords: &'a [f64],
}

impl<'a> Polygon<'a> {
    /// Wrap a flat coordinate list.
    ///
    /// Returns `None` if the list has an odd number of values, since the
    /// coordinates cannot be paired into vertices.
    pub fn from_flat(coords: &'a [f64]) -> Option<Self> {
        if coords.len() % 2 != 0 {
            return None;
        }
        Some(Self { coords })
    }

    pub fn vertex_count(&self) -> usize {
        self.coords.len() / 2
    }

    /// Vertices as `(x, y)` pairs, in original order.
    pub fn vertices(&self) -> impl Iterator<Item = (f64, f64)> + 'a {
        let coords: &'a [f64] = self.coords;
        coords.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// Shoelace sum halved. Positive for counter-clockwise traversal in a
    /// y-up frame, negative for clockwise.
    pub fn signed_area(&self) -> f64 {
        if self.vertex_count() < 3 {
            return 0.0;
        }

        let first = self.vertices().next();
        let next = self.vertices().skip(1).chain(first);

        let twice: f64 = self
            .vertices()
            .zip(next)
            .map(|((x0, y0), (x1, y1))| x0 * y1 - x1 * y0)
            .sum();

        twice / 2.0
    }

    /// Enclosed area. Self-intersecting outlines give the plain shoelace
    /// result; no validity check is made.
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_odd_coordinate_count() {
        assert!(Polygon::from_flat(&[0.0, 0.0, 1.0]).is_none());
        assert!(Polygon::from_flat(&[]).is_some());
    }

    #[test]
    fn test_rectangle_area_both_orientations() {
        let ccw = [0.0, 0.0, 4.0, 0.0, 4.0, 3.0, 0.0, 3.0];
        let cw = [0.0, 0.0, 0.0, 3.0, 4.0, 3.0, 4.0, 0.0];

        let ccw = Polygon::from_flat(&ccw).unwrap();
        let cw = Polygon::from_flat(&cw).unwrap();

        assert!((ccw.area() - 12.0).abs() < EPS);
        assert!((cw.area() - 12.0).abs() < EPS);
        assert!(ccw.signed_area() > 0.0);
        assert!(cw.signed_area() < 0.0);
    }

    #[test]
    fn test_rectangles_of_various_sizes() {
        for &(x, y, w, h) in &[
            (0.0, 0.0, 1.0, 1.0),
            (10.5, 20.25, 3.5, 7.0),
            (-5.0, -5.0, 100.0, 0.5),
            (1000.0, 2000.0, 640.0, 480.0),
        ] {
            let coords = [x, y, x + w, y, x + w, y + h, x, y + h];
            let polygon = Polygon::from_flat(&coords).unwrap();
            assert!((polygon.area() - w * h).abs() < 1e-6, "{}x{}", w, h);
        }
    }

    #[test]
    fn test_triangle_area() {
        let coords = [0.0, 0.0, 4.0, 0.0, 0.0, 3.0];
        let polygon = Polygon::from_flat(&coords).unwrap();
        assert_eq!(polygon.vertex_count(), 3);
        assert!((polygon.area() - 6.0).abs() < EPS);
    }

    #[test]
    fn test_degenerate_polygons_have_no_area() {
        let point = [1.0, 1.0];
        let segment = [0.0, 0.0, 5.0, 5.0];
        let collinear = [0.0, 0.0, 1.0, 1.0, 2.0, 2.0];

        assert_eq!(Polygon::from_flat(&point).unwrap().area(), 0.0);
        assert_eq!(Polygon::from_flat(&segment).unwrap().area(), 0.0);
        assert!(Polygon::from_flat(&collinear).unwrap().area().abs() < EPS);
    }

    #[test]
    fn test_self_intersecting_bowtie() {
        // The two lobes cancel out under the shoelace sum.
        let coords = [0.0, 0.0, 2.0, 2.0, 2.0, 0.0, 0.0, 2.0];
        let polygon = Polygon::from_flat(&coords).unwrap();
        assert!(polygon.area().abs() < EPS);
    }

    #[test]
    fn test_vertices_pairing() {
        let coords = [1.0, 2.0, 3.0, 4.0];
        let polygon = Polygon::from_flat(&coords).unwrap();
        let vertices: Vec<_> = polygon.vertices().collect();
        assert_eq!(vertices, vec![(1.0, 2.0), (3.0, 4.0)]);
    }
}
