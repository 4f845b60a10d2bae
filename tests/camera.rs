use nalgebra::{UnitQuaternion, Vector3};
use vitrail::components::{Camera, CameraDesc, ProjectionType};

fn camera_at(position: Vector3<f32>) -> Camera {
    Camera::new(
        &CameraDesc::builder()
            .position(position)
            .look_at(Vector3::zeros())
            .build(),
    )
}

fn assert_orthonormal(camera: &Camera) {
    let (f, u, r) = (camera.forward(), camera.up(), camera.right());
    for v in [f, u, r] {
        assert!((v.norm() - 1.0).abs() < 1e-4, "not unit: {v:?}");
    }
    assert!(f.dot(&u).abs() < 1e-4);
    assert!(f.dot(&r).abs() < 1e-4);
    assert!(u.dot(&r).abs() < 1e-4);
}

#[test]
fn basis_stays_orthonormal() {
    let mut camera = camera_at(Vector3::new(3.0, 4.0, 5.0));
    assert_orthonormal(&camera);

    camera.set_look_at(Vector3::new(-2.0, 1.0, 0.5));
    assert_orthonormal(&camera);

    camera.rotate(UnitQuaternion::from_euler_angles(0.3, -1.2, 0.7));
    assert_orthonormal(&camera);

    camera.rotate_around(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 1.0), 2.0);
    assert_orthonormal(&camera);

    camera.set_up_vector(Vector3::new(0.2, 1.0, 0.0));
    assert_orthonormal(&camera);

    camera.set_orientation(UnitQuaternion::from_euler_angles(1.0, 0.5, 0.25));
    assert_orthonormal(&camera);
}

#[test]
fn degenerate_inputs_fall_back_to_world_axes() {
    let mut camera = camera_at(Vector3::new(0.0, 0.0, 10.0));

    // target at the eye
    camera.set_look_at(Vector3::new(0.0, 0.0, 10.0));
    assert_eq!(camera.forward(), Vector3::new(0.0, 0.0, -1.0));
    assert_orthonormal(&camera);

    let before = camera.forward();
    camera.set_look_at(Vector3::new(f32::NAN, 0.0, 0.0));
    assert_eq!(camera.forward(), before);

    camera.set_up_vector(Vector3::zeros());
    assert_orthonormal(&camera);
}

#[test]
fn fov_shrinks_as_zoom_grows() {
    let mut camera = camera_at(Vector3::new(0.0, 0.0, 10.0));
    let mut last_fov = f32::INFINITY;

    for step in 1..=150 {
        camera.set_zoom_level(step as f32 * 0.1);
        let fov = camera.fov();
        assert!(fov <= last_fov, "fov grew at zoom {}", camera.zoom_level());
        assert!((Camera::MIN_FOV..=Camera::MAX_FOV).contains(&fov));
        assert!(
            (Camera::MIN_ORTHO_HEIGHT..=Camera::MAX_ORTHO_HEIGHT).contains(&camera.ortho_height())
        );
        last_fov = fov;
    }
}

#[test]
fn zoom_by_is_monotonic() {
    let mut camera = camera_at(Vector3::new(0.0, 0.0, 10.0));

    for _ in 0..200 {
        let before = camera.zoom_level();
        camera.zoom_by(1.0);
        assert!(camera.zoom_level() >= before);
    }
    assert!(camera.zoom_level() <= Camera::MAX_ZOOM_LEVEL);

    for _ in 0..400 {
        let before = camera.zoom_level();
        camera.zoom_by(-1.0);
        assert!(camera.zoom_level() <= before);
    }
    assert!(camera.zoom_level() >= Camera::MIN_ZOOM_LEVEL);
}

#[test]
fn ten_wheel_steps_zoom_in_then_back_out() {
    let mut camera = camera_at(Vector3::new(0.0, 0.0, 10.0));
    let initial_fov = camera.fov();

    let mut levels = vec![camera.zoom_level()];
    for _ in 0..10 {
        camera.zoom_by(1.0);
        levels.push(camera.zoom_level());
    }

    assert!(levels.windows(2).all(|w| w[1] > w[0]));
    assert!(camera.fov() < initial_fov);

    for _ in 0..10 {
        camera.zoom_by(-1.0);
    }
    assert!(camera.zoom_level() < levels[10]);
}

#[test]
fn pure_blends_are_exact_projections() {
    let mut camera = camera_at(Vector3::new(0.0, 2.0, 8.0));

    camera.set_projection_type(ProjectionType::Perspective, 1.0);
    camera.update();
    assert_eq!(camera.projection_blend(), 0.0);
    assert_eq!(*camera.projection_matrix(), camera.perspective_matrix());

    camera.set_projection_type(ProjectionType::Orthographic, 1.0);
    camera.update();
    assert_eq!(camera.projection_blend(), 1.0);
    assert_eq!(*camera.projection_matrix(), camera.orthographic_matrix());

    camera.set_projection_type(ProjectionType::Orthographic, 0.25);
    camera.update();
    let expected =
        camera.perspective_matrix() * 0.75 + camera.orthographic_matrix() * 0.25;
    assert!((camera.projection_matrix() - expected).norm() < 1e-5);
}

#[test]
fn blend_is_clamped() {
    let mut camera = Camera::default();
    camera.set_projection_type(ProjectionType::Orthographic, 4.0);
    assert_eq!(camera.projection_blend(), 1.0);
    camera.set_projection_type(ProjectionType::Perspective, -3.0);
    assert_eq!(camera.projection_blend(), 1.0);
    assert_eq!(camera.projection_type(), ProjectionType::Perspective);
}

#[test]
fn orthographic_desc_starts_fully_blended() {
    let camera = Camera::new(
        &CameraDesc::builder()
            .projection(ProjectionType::Orthographic)
            .build(),
    );
    assert_eq!(camera.projection_blend(), 1.0);
    assert_eq!(*camera.projection_matrix(), camera.orthographic_matrix());
}

#[test]
fn rotate_around_keeps_distance_to_pivot() {
    let pivot = Vector3::new(1.0, 0.0, -2.0);
    let mut camera = camera_at(Vector3::new(1.0, 0.0, 3.0));

    camera.rotate_around(pivot, Vector3::y(), std::f32::consts::FRAC_PI_2);

    assert!(((camera.position() - pivot).norm() - 5.0).abs() < 1e-4);
    assert!((camera.position() - Vector3::new(6.0, 0.0, -2.0)).norm() < 1e-4);
}

#[test]
fn view_projection_is_projection_times_view() {
    let mut camera = camera_at(Vector3::new(2.0, 3.0, 4.0));
    camera.update();
    assert_eq!(
        camera.view_projection_matrix(),
        camera.projection_matrix() * camera.view_matrix()
    );
}
