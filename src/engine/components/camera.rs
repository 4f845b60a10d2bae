use crate::components::Component;
use crate::core::Node;
use crate::utils::{
    is_nan_vec, lerp_matrix, normalize_or, orthographic_rh_zo, perspective_rh_zo,
    DIRECTION_EPSILON,
};
use bon::Builder;
use nalgebra::{Matrix4, Point3, Unit, UnitQuaternion, Vector3};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ProjectionType {
    #[default]
    Perspective,
    Orthographic,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum MatrixState {
    Clean,
    Dirty,
}

#[derive(Debug, Copy, Clone, PartialEq, Builder)]
pub struct CameraDesc {
    /// Vertical field of view in degrees.
    #[builder(default = 45.0)]
    pub fov_y: f32,
    #[builder(default = 16.0 / 9.0)]
    pub aspect_ratio: f32,
    #[builder(default = 0.3)]
    pub near: f32,
    #[builder(default = 1000.0)]
    pub far: f32,
    #[builder(default = 20.0)]
    pub ortho_width: f32,
    #[builder(default = 11.25)]
    pub ortho_height: f32,
    #[builder(default = Vector3::new(0.0, 5.0, 15.0))]
    pub position: Vector3<f32>,
    #[builder(default = Vector3::zeros())]
    pub look_at: Vector3<f32>,
    #[builder(default = Vector3::y())]
    pub up: Vector3<f32>,
    #[builder(default)]
    pub projection: ProjectionType,
}

impl Default for CameraDesc {
    fn default() -> Self {
        CameraDesc {
            fov_y: 45.0,
            aspect_ratio: 16.0 / 9.0,
            near: 0.3,
            far: 1000.0,
            ortho_width: 20.0,
            ortho_height: 11.25,
            position: Vector3::new(0.0, 5.0, 15.0),
            look_at: Vector3::zeros(),
            up: Vector3::y(),
            projection: ProjectionType::Perspective,
        }
    }
}

/// A view with a continuous blend between perspective and orthographic projection.
///
/// Right-handed: the canonical basis looks down -Z with +Y up and +X right. Projections
/// map depth to `0..=1`. The basis stays orthonormal after every mutation.
///
/// Mutators only mark the view or projection as stale, [`Camera::update`] recomputes
/// whatever is stale. Calling it every frame is cheap.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vector3<f32>,
    forward: Vector3<f32>,
    up: Vector3<f32>,
    right: Vector3<f32>,

    fov_y: f32,
    aspect_ratio: f32,
    near: f32,
    far: f32,
    ortho_width: f32,
    ortho_height: f32,

    projection_type: ProjectionType,
    projection_blend: f32,
    zoom_level: f32,

    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    view_state: MatrixState,
    projection_state: MatrixState,
}

impl Default for Camera {
    fn default() -> Self {
        Camera::new(&CameraDesc::default())
    }
}

const FORWARD: Vector3<f32> = Vector3::new(0.0, 0.0, -1.0);
const UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);
const RIGHT: Vector3<f32> = Vector3::new(1.0, 0.0, 0.0);

impl Camera {
    pub const MIN_FOV: f32 = 2.0;
    pub const MAX_FOV: f32 = 120.0;
    pub const MIN_ORTHO_HEIGHT: f32 = 1.0;
    pub const MAX_ORTHO_HEIGHT: f32 = 100.0;
    /// 10x zoomed out.
    pub const MIN_ZOOM_LEVEL: f32 = 0.1;
    /// 15x zoomed in.
    pub const MAX_ZOOM_LEVEL: f32 = 15.0;
    pub const DEFAULT_FOV: f32 = 60.0;
    pub const DEFAULT_ORTHO_HEIGHT: f32 = 20.0;

    /// Builds the basis from the desc and applies zoom level 1, which derives the field
    /// of view and orthographic extent from the position.
    pub fn new(desc: &CameraDesc) -> Camera {
        let forward = normalize_or(desc.look_at - desc.position, FORWARD);
        let up = normalize_or(desc.up, UP);

        let mut camera = Camera {
            position: desc.position,
            forward,
            up,
            right: RIGHT,
            fov_y: desc.fov_y,
            aspect_ratio: desc.aspect_ratio,
            near: desc.near,
            far: desc.far,
            ortho_width: desc.ortho_width,
            ortho_height: desc.ortho_height,
            projection_type: desc.projection,
            projection_blend: match desc.projection {
                ProjectionType::Perspective => 0.0,
                ProjectionType::Orthographic => 1.0,
            },
            zoom_level: 1.0,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            view_state: MatrixState::Dirty,
            projection_state: MatrixState::Dirty,
        };

        camera.orthonormalize();
        camera.set_zoom_level(1.0);
        camera.update();
        camera
    }

    /// Re-derives right from forward and up, then up from right and forward.
    fn orthonormalize(&mut self) {
        self.right = normalize_or(self.forward.cross(&self.up), RIGHT);
        self.up = normalize_or(self.right.cross(&self.forward), UP);
    }

    #[inline]
    fn mark_view_dirty(&mut self) {
        self.view_state = MatrixState::Dirty;
    }

    #[inline]
    fn mark_projection_dirty(&mut self) {
        self.projection_state = MatrixState::Dirty;
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.mark_view_dirty();
    }

    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.position += delta;
        self.mark_view_dirty();
    }

    /// Points the camera at `target`. A NaN target is ignored, a target at the camera
    /// position falls back to the canonical forward axis.
    pub fn set_look_at(&mut self, target: Vector3<f32>) {
        if is_nan_vec(&target) {
            return;
        }

        self.forward = normalize_or(target - self.position, FORWARD);
        self.orthonormalize();
        self.mark_view_dirty();
    }

    pub fn set_up_vector(&mut self, up: Vector3<f32>) {
        if is_nan_vec(&up) {
            return;
        }

        self.up = normalize_or(up, UP);
        self.orthonormalize();
        self.mark_view_dirty();
    }

    /// Sets the basis to the canonical axes rotated by `orientation`.
    pub fn set_orientation(&mut self, orientation: UnitQuaternion<f32>) {
        self.forward = orientation * FORWARD;
        self.up = orientation * UP;
        self.right = orientation * RIGHT;
        self.mark_view_dirty();
    }

    /// Rotates the current basis by `rotation`.
    pub fn rotate(&mut self, rotation: UnitQuaternion<f32>) {
        self.forward = rotation * self.forward;
        self.up = rotation * self.up;
        self.right = rotation * self.right;
        self.mark_view_dirty();
    }

    /// Orbits the position around `pivot` and turns the basis by the same rotation.
    /// `angle` is in radians. A degenerate axis leaves the camera unchanged.
    pub fn rotate_around(&mut self, pivot: Vector3<f32>, axis: Vector3<f32>, angle: f32) {
        let Some(axis) = Unit::try_new(axis, DIRECTION_EPSILON) else {
            return;
        };
        let rotation = UnitQuaternion::from_axis_angle(&axis, angle);

        self.position = pivot + rotation * (self.position - pivot);
        self.forward = rotation * self.forward;
        self.up = rotation * self.up;
        self.right = rotation * self.right;
        self.mark_view_dirty();
    }

    /// `fov_y` in degrees.
    pub fn set_perspective(&mut self, fov_y: f32, aspect_ratio: f32, near: f32, far: f32) {
        self.fov_y = fov_y;
        self.aspect_ratio = aspect_ratio;
        self.near = near;
        self.far = far;
        self.mark_projection_dirty();
    }

    pub fn set_orthographic(&mut self, width: f32, height: f32, near: f32, far: f32) {
        self.ortho_width = width;
        self.ortho_height = height;
        self.near = near;
        self.far = far;
        self.mark_projection_dirty();
    }

    /// Ignored unless positive. Keeps the orthographic height and widens or narrows the
    /// orthographic width.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        if aspect_ratio > 0.0 {
            self.aspect_ratio = aspect_ratio;
            self.ortho_width = self.ortho_height * aspect_ratio;
            self.mark_projection_dirty();
        }
    }

    /// Blend always means "how orthographic": `blend` for orthographic, `1 - blend` for
    /// perspective, clamped to `0..=1`.
    pub fn set_projection_type(&mut self, projection: ProjectionType, blend: f32) {
        self.projection_type = projection;
        self.projection_blend = match projection {
            ProjectionType::Orthographic => blend.clamp(0.0, 1.0),
            ProjectionType::Perspective => (1.0 - blend).clamp(0.0, 1.0),
        };
        self.mark_projection_dirty();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.set_aspect_ratio(width as f32 / height as f32);
            self.mark_projection_dirty();
        }
    }

    /// Clamps the zoom level and derives the field of view from it. The orthographic
    /// height is matched to the height the perspective view shows at the camera's distance
    /// from the origin, so both projections show objects there at the same size.
    pub fn set_zoom_level(&mut self, zoom_level: f32) {
        self.zoom_level = zoom_level.clamp(Self::MIN_ZOOM_LEVEL, Self::MAX_ZOOM_LEVEL);

        self.fov_y = (Self::DEFAULT_FOV / self.zoom_level).clamp(Self::MIN_FOV, Self::MAX_FOV);

        let distance = self.position.norm();
        let visible_height = 2.0 * distance * (self.fov_y.to_radians() / 2.0).tan();

        self.ortho_height = visible_height.clamp(Self::MIN_ORTHO_HEIGHT, Self::MAX_ORTHO_HEIGHT);
        self.ortho_width = self.ortho_height * self.aspect_ratio;

        self.mark_projection_dirty();
    }

    /// Zooms in for positive and out for negative deltas.
    ///
    /// The step is relative to the current zoom. It grows with `sqrt(zoom / max)` and is
    /// shaped by a speed curve over the normalized zoom: a gentle ramp below zoom 0.5, a
    /// parabola peaking halfway through the range above it. Zooming out is additionally
    /// faster the further out the camera already is.
    pub fn zoom_by(&mut self, delta: f32) {
        let range = Self::MAX_ZOOM_LEVEL - Self::MIN_ZOOM_LEVEL;
        let normalized = (self.zoom_level - Self::MIN_ZOOM_LEVEL) / range;
        let threshold = (0.5 - Self::MIN_ZOOM_LEVEL) / range;

        let speed = if normalized < threshold {
            0.3 + normalized * 1.5
        } else {
            4.0 * normalized * (1.0 - normalized)
        }
        .max(0.2);

        let adaptive = 0.1 * (self.zoom_level / Self::MAX_ZOOM_LEVEL).sqrt();

        let zoom = if delta > 0.0 {
            self.zoom_level * (1.0 + delta * adaptive * speed)
        } else {
            let out_factor = adaptive * (1.0 + (1.0 - normalized));
            self.zoom_level / (1.0 - delta * out_factor * speed)
        };

        self.set_zoom_level(zoom);
    }

    /// Recomputes the stale matrices. Idempotent.
    pub fn update(&mut self) {
        if self.view_state == MatrixState::Dirty {
            self.update_view_matrix();
            self.view_state = MatrixState::Clean;
        }

        if self.projection_state == MatrixState::Dirty {
            self.update_projection_matrix();
            self.projection_state = MatrixState::Clean;
        }
    }

    fn update_view_matrix(&mut self) {
        let eye = Point3::from(self.position);
        let target = Point3::from(self.position + self.forward);
        self.view = Matrix4::look_at_rh(&eye, &target, &self.up);
    }

    fn update_projection_matrix(&mut self) {
        self.projection = if self.projection_blend <= 0.0 {
            self.perspective_matrix()
        } else if self.projection_blend >= 1.0 {
            self.orthographic_matrix()
        } else {
            // component-wise, not a projective blend
            lerp_matrix(
                &self.perspective_matrix(),
                &self.orthographic_matrix(),
                self.projection_blend,
            )
        };
    }

    pub fn perspective_matrix(&self) -> Matrix4<f32> {
        perspective_rh_zo(self.fov_y.to_radians(), self.aspect_ratio, self.near, self.far)
    }

    pub fn orthographic_matrix(&self) -> Matrix4<f32> {
        orthographic_rh_zo(self.ortho_width, self.ortho_height, self.near, self.far)
    }

    /// The view matrix as of the last [`Camera::update`].
    #[inline]
    pub fn view_matrix(&self) -> &Matrix4<f32> {
        &self.view
    }

    /// The projection matrix as of the last [`Camera::update`].
    #[inline]
    pub fn projection_matrix(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection * self.view
    }

    #[inline]
    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    #[inline]
    pub fn forward(&self) -> Vector3<f32> {
        self.forward
    }

    #[inline]
    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    #[inline]
    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    /// Vertical field of view in degrees.
    #[inline]
    pub fn fov(&self) -> f32 {
        self.fov_y
    }

    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    #[inline]
    pub fn near(&self) -> f32 {
        self.near
    }

    #[inline]
    pub fn far(&self) -> f32 {
        self.far
    }

    #[inline]
    pub fn ortho_width(&self) -> f32 {
        self.ortho_width
    }

    #[inline]
    pub fn ortho_height(&self) -> f32 {
        self.ortho_height
    }

    #[inline]
    pub fn projection_type(&self) -> ProjectionType {
        self.projection_type
    }

    #[inline]
    pub fn projection_blend(&self) -> f32 {
        self.projection_blend
    }

    #[inline]
    pub fn zoom_level(&self) -> f32 {
        self.zoom_level
    }

    pub fn is_dirty(&self) -> bool {
        self.view_state == MatrixState::Dirty || self.projection_state == MatrixState::Dirty
    }
}

/// A camera attached to a node refreshes its matrices with the scene.
impl Component for Camera {
    fn update(&mut self, _node: &mut Node, _dt: f32) {
        Camera::update(self);
    }
}
