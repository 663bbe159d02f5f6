//! Moving-collider state and the swept-sphere narrow phase
//!
//! All tests run in "collider space": query positions and velocities are
//! divided by the per-axis radius up front, turning the ellipsoid into a
//! unit sphere, and candidate triangles are brought into the same space by
//! composing the mesh world transform with an inverse-radius scaling. The
//! sweep itself follows Fauerby, "Improved Collision detection and
//! Response" (2003): plane intersection window, in-triangle test at the
//! plane contact point, then vertex and edge sweeps solved as quadratics.
//!
//! A [`Collider`] is owned by exactly one in-flight resolution call and
//! accumulates the nearest impact across every candidate it is fed.

use crate::foundation::math::{Mat4, Point3, Vec3};

/// Contact plane of a candidate triangle, in collider space
struct ContactPlane {
    normal: Vec3,
    d: f32,
}

impl ContactPlane {
    fn from_points(p1: &Vec3, p2: &Vec3, p3: &Vec3) -> Self {
        let normal = (p2 - p1)
            .cross(&(p3 - p1))
            .try_normalize(0.0)
            .unwrap_or_else(Vec3::zeros);
        let d = -normal.dot(p1);
        Self { normal, d }
    }

    fn signed_distance_to(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    fn is_front_facing_to(&self, direction: &Vec3, epsilon: f32) -> bool {
        self.normal.dot(direction) <= epsilon
    }
}

/// Smallest root of `a*t^2 + b*t + c = 0` inside `(0, max_r)`, if any
fn lowest_root(a: f32, b: f32, c: f32, max_r: f32) -> Option<f32> {
    let determinant = b * b - 4.0 * a * c;
    if determinant < 0.0 {
        return None;
    }
    let sqrt_d = determinant.sqrt();
    let mut r1 = (-b - sqrt_d) / (2.0 * a);
    let mut r2 = (-b + sqrt_d) / (2.0 * a);
    if r1 > r2 {
        std::mem::swap(&mut r1, &mut r2);
    }
    if r1 > 0.0 && r1 < max_r {
        return Some(r1);
    }
    if r2 > 0.0 && r2 < max_r {
        return Some(r2);
    }
    None
}

/// Same-side containment test of `point` against triangle `(pa, pb, pc)`
/// with plane normal `n`
fn point_in_triangle(point: &Vec3, pa: &Vec3, pb: &Vec3, pc: &Vec3, n: &Vec3) -> bool {
    let e0 = pa - point;
    let e1 = pb - point;
    if e0.cross(&e1).dot(n) < 0.0 {
        return false;
    }
    let e2 = pc - point;
    if e1.cross(&e2).dot(n) < 0.0 {
        return false;
    }
    e2.cross(&e0).dot(n) >= 0.0
}

/// Axis-aligned box versus sphere overlap test, in world units
fn intersect_box_aa_sphere(
    box_minimum: &Vec3,
    box_maximum: &Vec3,
    sphere_center: &Vec3,
    sphere_radius: f32,
) -> bool {
    if box_minimum.x > sphere_center.x + sphere_radius {
        return false;
    }
    if sphere_center.x - sphere_radius > box_maximum.x {
        return false;
    }
    if box_minimum.y > sphere_center.y + sphere_radius {
        return false;
    }
    if sphere_center.y - sphere_radius > box_maximum.y {
        return false;
    }
    if box_minimum.z > sphere_center.z + sphere_radius {
        return false;
    }
    if sphere_center.z - sphere_radius > box_maximum.z {
        return false;
    }
    true
}

/// Compose a mesh world matrix with the inverse-radius scaling that maps
/// world space into collider space
pub fn collision_transform(world_matrix: &Mat4, radius: &Vec3) -> Mat4 {
    let scaling = Mat4::new_nonuniform_scaling(&Vec3::new(
        1.0 / radius.x,
        1.0 / radius.y,
        1.0 / radius.z,
    ));
    scaling * world_matrix
}

/// The moving ellipsoid proxy of one resolution call.
///
/// Mutable working state for the slide-and-retry loop: re-initialized at
/// the start of every iteration, it records whether any candidate triangle
/// was hit, the nearest impact point and the identity of the impacted mesh.
#[derive(Debug, Clone)]
pub struct Collider {
    /// Per-axis ellipsoid radius, constant for the duration of a query
    pub radius: Vec3,
    /// Iteration counter of the slide-and-retry loop
    pub retry: u32,
    /// Whether the current pass found at least one impact
    pub collision_found: bool,
    /// Unique id of the nearest impacted mesh, if any
    pub collided_mesh_id: Option<u64>,
    /// Scaled velocity captured when the owning query started
    pub initial_velocity: Vec3,
    /// Scaled position captured when the owning query started
    pub initial_position: Vec3,

    velocity: Vec3,
    base_point: Vec3,
    normalized_velocity: Vec3,
    base_point_world: Vec3,
    velocity_world_length: f32,
    epsilon: f32,
    nearest_distance: f32,
    intersection_point: Vec3,
}

impl Collider {
    /// Create a collider with the given per-axis radius
    pub fn new(radius: Vec3) -> Self {
        Self {
            radius,
            retry: 0,
            collision_found: false,
            collided_mesh_id: None,
            initial_velocity: Vec3::zeros(),
            initial_position: Vec3::zeros(),
            velocity: Vec3::zeros(),
            base_point: Vec3::zeros(),
            normalized_velocity: Vec3::zeros(),
            base_point_world: Vec3::zeros(),
            velocity_world_length: 0.0,
            epsilon: 0.0,
            nearest_distance: f32::MAX,
            intersection_point: Vec3::zeros(),
        }
    }

    /// Arm the collider for one pass of the solver loop.
    ///
    /// `source` and `dir` are in collider space; `e` is the contact offset
    /// kept between the sphere and any surface it slides along.
    pub fn initialize(&mut self, source: Vec3, dir: Vec3, e: f32) {
        self.velocity = dir;
        self.normalized_velocity = dir.try_normalize(0.0).unwrap_or_else(Vec3::zeros);
        self.base_point = source;
        self.base_point_world = source.component_mul(&self.radius);
        self.velocity_world_length = dir.component_mul(&self.radius).norm();
        self.epsilon = e;
        self.collision_found = false;
    }

    /// Distance the current pass travels before its nearest impact
    pub fn nearest_distance(&self) -> f32 {
        self.nearest_distance
    }

    /// Nearest impact point of the current pass, in collider space
    pub fn intersection_point(&self) -> &Vec3 {
        &self.intersection_point
    }

    /// Cheap world-space rejection against a candidate's bounding volumes.
    ///
    /// The swept volume is approximated by a sphere of radius
    /// `|world velocity| + max(radius)` around the start position.
    pub fn can_do_collision(
        &self,
        sphere_center: &Vec3,
        sphere_radius: f32,
        box_minimum: &Vec3,
        box_maximum: &Vec3,
    ) -> bool {
        let distance = (self.base_point_world - sphere_center).norm();
        let max_radius = self.radius.x.max(self.radius.y).max(self.radius.z);
        if distance > self.velocity_world_length + max_radius + sphere_radius {
            return false;
        }
        intersect_box_aa_sphere(
            box_minimum,
            box_maximum,
            &self.base_point_world,
            self.velocity_world_length + max_radius,
        )
    }

    /// Narrow-phase test of one sub-mesh range.
    ///
    /// Transforms the range's vertices into collider space with `transform`
    /// and sweeps the unit sphere against each triangle. `positions` and
    /// `indices` are the owning geometry's flat streams; indices are
    /// rebased by `vertices_start`.
    pub fn collide_sub_mesh(
        &mut self,
        transform: &Mat4,
        positions: &[f32],
        indices: &[u32],
        vertices_start: u32,
        vertices_count: u32,
        index_start: u32,
        index_count: u32,
        has_material: bool,
        mesh_id: u64,
    ) {
        let start = vertices_start as usize;
        let count = vertices_count as usize;
        let mut vertices = Vec::with_capacity(count);
        for i in start..start + count {
            let p = Point3::new(positions[3 * i], positions[3 * i + 1], positions[3 * i + 2]);
            vertices.push(transform.transform_point(&p).coords);
        }

        let mut i = index_start as usize;
        let end = (index_start + index_count) as usize;
        while i + 2 < end {
            let p1 = vertices[(indices[i] - vertices_start) as usize];
            let p2 = vertices[(indices[i + 1] - vertices_start) as usize];
            let p3 = vertices[(indices[i + 2] - vertices_start) as usize];
            // Winding is flipped so contact planes face the approach side.
            self.test_triangle(&p3, &p2, &p1, has_material, mesh_id);
            i += 3;
        }
    }

    /// Sweep the unit sphere against a single triangle, keeping the hit if
    /// it is the nearest seen this pass
    fn test_triangle(&mut self, p1: &Vec3, p2: &Vec3, p3: &Vec3, has_material: bool, mesh_id: u64) {
        let plane = ContactPlane::from_points(p1, p2, p3);

        // Material-less surfaces only collide on their front faces.
        if !has_material && !plane.is_front_facing_to(&self.normalized_velocity, 0.0) {
            return;
        }

        let signed_distance = plane.signed_distance_to(&self.base_point);
        let normal_dot_velocity = plane.normal.dot(&self.velocity);

        let mut embedded_in_plane = false;
        let mut t0;
        if normal_dot_velocity == 0.0 {
            if signed_distance.abs() >= 1.0 {
                return;
            }
            embedded_in_plane = true;
            t0 = 0.0;
        } else {
            t0 = (-1.0 - signed_distance) / normal_dot_velocity;
            let mut t1 = (1.0 - signed_distance) / normal_dot_velocity;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > 1.0 || t1 < 0.0 {
                return;
            }
            t0 = t0.clamp(0.0, 1.0);
        }

        let mut collision_point = Vec3::zeros();
        let mut found = false;
        let mut t = 1.0;

        if !embedded_in_plane {
            let plane_intersection = self.base_point - plane.normal + self.velocity * t0;
            if point_in_triangle(&plane_intersection, p1, p2, p3, &plane.normal) {
                found = true;
                t = t0;
                collision_point = plane_intersection;
            }
        }

        if !found {
            let velocity_squared_length = self.velocity.norm_squared();

            // Vertex sweeps
            for p in [p1, p2, p3] {
                let base_to_vertex = self.base_point - p;
                let a = velocity_squared_length;
                let b = 2.0 * self.velocity.dot(&base_to_vertex);
                let c = base_to_vertex.norm_squared() - 1.0;
                if let Some(root) = lowest_root(a, b, c, t) {
                    t = root;
                    found = true;
                    collision_point = *p;
                }
            }

            // Edge sweeps
            for (pa, pb) in [(p1, p2), (p2, p3), (p3, p1)] {
                let edge = pb - pa;
                let base_to_vertex = pa - self.base_point;
                let edge_squared_length = edge.norm_squared();
                let edge_dot_velocity = edge.dot(&self.velocity);
                let edge_dot_base_to_vertex = edge.dot(&base_to_vertex);

                let a = edge_squared_length * (-velocity_squared_length)
                    + edge_dot_velocity * edge_dot_velocity;
                let b = edge_squared_length * (2.0 * self.velocity.dot(&base_to_vertex))
                    - 2.0 * edge_dot_velocity * edge_dot_base_to_vertex;
                let c = edge_squared_length * (1.0 - base_to_vertex.norm_squared())
                    + edge_dot_base_to_vertex * edge_dot_base_to_vertex;
                if let Some(root) = lowest_root(a, b, c, t) {
                    // The root is only valid if it lands inside the segment.
                    let f = (edge_dot_velocity * root - edge_dot_base_to_vertex)
                        / edge_squared_length;
                    if (0.0..=1.0).contains(&f) {
                        t = root;
                        found = true;
                        collision_point = pa + edge * f;
                    }
                }
            }
        }

        if found {
            let distance_to_collision = t * self.velocity.norm();
            if !self.collision_found || distance_to_collision < self.nearest_distance {
                self.nearest_distance = distance_to_collision;
                self.intersection_point = collision_point;
                self.collision_found = true;
                self.collided_mesh_id = Some(mesh_id);
            }
        }
    }

    /// Slide response: move up to the nearest impact, then redirect the
    /// remaining motion along the obstructing surface.
    ///
    /// `position` and `velocity` are rewritten in place with the new
    /// candidate start point and slide velocity. The caller must guarantee
    /// a non-zero velocity.
    pub fn get_response(&self, position: &mut Vec3, velocity: &mut Vec3) {
        let destination = *position + *velocity;
        *velocity *= self.nearest_distance / velocity.norm();
        *position = self.base_point + *velocity;

        let mut slide_plane_normal = (*position - self.intersection_point)
            .try_normalize(0.0)
            .unwrap_or_else(Vec3::zeros);
        let displacement = slide_plane_normal * self.epsilon;
        *position += displacement;
        let intersection = self.intersection_point + displacement;

        let distance = slide_plane_normal.dot(&(destination - intersection));
        slide_plane_normal *= distance;
        let new_destination = destination - slide_plane_normal;

        *velocity = new_destination - intersection;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_collider() -> Collider {
        Collider::new(Vec3::new(1.0, 1.0, 1.0))
    }

    /// One y=0 triangle large enough to act as a plane, ordered as the
    /// narrow phase receives them, contact normal up.
    fn floor_triangle() -> [Vec3; 3] {
        [
            Vec3::new(-100.0, 0.0, -100.0),
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(100.0, 0.0, -100.0),
        ]
    }

    #[test]
    fn lowest_root_picks_smallest_in_range() {
        // (t - 1)(t - 3) = t^2 - 4t + 3
        assert_eq!(lowest_root(1.0, -4.0, 3.0, 10.0), Some(1.0));
        // Smaller root outside the window, larger one inside.
        assert_eq!(lowest_root(1.0, -4.0, 3.0, 2.0), Some(1.0));
        assert_eq!(lowest_root(1.0, -4.0, 3.0, 0.5), None);
        // No real roots.
        assert_eq!(lowest_root(1.0, 0.0, 1.0, 10.0), None);
    }

    #[test]
    fn point_in_triangle_accepts_interior_rejects_exterior() {
        let pa = Vec3::new(0.0, 0.0, 0.0);
        let pb = Vec3::new(2.0, 0.0, 0.0);
        let pc = Vec3::new(0.0, 0.0, 2.0);
        let n = Vec3::new(0.0, -1.0, 0.0);
        assert!(point_in_triangle(
            &Vec3::new(0.5, 0.0, 0.5),
            &pa,
            &pb,
            &pc,
            &n
        ));
        assert!(!point_in_triangle(
            &Vec3::new(3.0, 0.0, 3.0),
            &pa,
            &pb,
            &pc,
            &n
        ));
    }

    #[test]
    fn can_do_collision_rejects_distant_candidates() {
        let mut collider = unit_collider();
        collider.initialize(Vec3::zeros(), Vec3::new(0.0, -1.0, 0.0), 0.01);

        // Sphere well outside the swept volume.
        assert!(!collider.can_do_collision(
            &Vec3::new(50.0, 0.0, 0.0),
            1.0,
            &Vec3::new(49.0, -1.0, -1.0),
            &Vec3::new(51.0, 1.0, 1.0),
        ));
        // Sphere straddling the sweep path.
        assert!(collider.can_do_collision(
            &Vec3::new(0.0, -1.5, 0.0),
            1.0,
            &Vec3::new(-1.0, -2.5, -1.0),
            &Vec3::new(1.0, -0.5, 1.0),
        ));
    }

    #[test]
    fn falling_sphere_hits_floor_triangle() {
        let mut collider = unit_collider();
        collider.initialize(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -10.0, 0.0), 0.01);
        let [p1, p2, p3] = floor_triangle();
        collider.test_triangle(&p1, &p2, &p3, false, 7);

        assert!(collider.collision_found);
        assert_eq!(collider.collided_mesh_id, Some(7));
        // Unit sphere center reaches y = 1 after travelling 4 units.
        assert_relative_eq!(collider.nearest_distance(), 4.0, epsilon = 1e-4);
    }

    #[test]
    fn back_face_is_ignored_without_material() {
        let mut collider = unit_collider();
        // Approach from below: the upward-facing triangle is a back face.
        collider.initialize(Vec3::new(0.0, -5.0, 0.0), Vec3::new(0.0, 10.0, 0.0), 0.01);
        let [p1, p2, p3] = floor_triangle();
        collider.test_triangle(&p1, &p2, &p3, false, 7);
        assert!(!collider.collision_found);

        // A bound material makes the surface two-sided.
        collider.initialize(Vec3::new(0.0, -5.0, 0.0), Vec3::new(0.0, 10.0, 0.0), 0.01);
        collider.test_triangle(&p1, &p2, &p3, true, 7);
        assert!(collider.collision_found);
    }

    #[test]
    fn nearest_impact_wins_across_triangles() {
        let mut collider = unit_collider();
        collider.initialize(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -10.0, 0.0), 0.01);

        let [p1, p2, p3] = floor_triangle();
        // Far floor first, then a nearer ledge at y = 2.
        collider.test_triangle(&p1, &p2, &p3, false, 1);
        let lift = Vec3::new(0.0, 2.0, 0.0);
        collider.test_triangle(&(p1 + lift), &(p2 + lift), &(p3 + lift), false, 2);

        assert_eq!(collider.collided_mesh_id, Some(2));
        assert_relative_eq!(collider.nearest_distance(), 2.0, epsilon = 1e-4);
    }

    #[test]
    fn response_slides_along_surface() {
        let mut collider = unit_collider();
        // Moving diagonally down and forward onto the floor.
        let start = Vec3::new(0.0, 2.0, 0.0);
        let motion = Vec3::new(4.0, -4.0, 0.0);
        collider.initialize(start, motion, 0.001);
        let [p1, p2, p3] = floor_triangle();
        collider.test_triangle(&p1, &p2, &p3, false, 1);
        assert!(collider.collision_found);

        let mut position = start;
        let mut velocity = motion;
        collider.get_response(&mut position, &mut velocity);

        // Residual velocity is redirected along the plane: no downward
        // component remains.
        assert_relative_eq!(velocity.y, 0.0, epsilon = 1e-3);
        assert!(velocity.x > 0.0);
        // The new start point rests just above the surface.
        assert!(position.y >= 1.0 - 1e-3);
    }

    #[test]
    fn degenerate_triangle_is_harmless_at_distance() {
        let mut collider = unit_collider();
        collider.initialize(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -1.0, 0.0), 0.01);
        let p = Vec3::new(30.0, 0.0, 30.0);
        collider.test_triangle(&p, &p, &p, true, 3);
        assert!(!collider.collision_found);
    }
}
