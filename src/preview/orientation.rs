//! Sensor-to-display rotation

use super::{DeviceOrientationInfo, DisplayRotation, Facing};

/// Clockwise rotation, in degrees, that makes sensor frames appear upright.
///
/// Front cameras are mirror-compensated so the preview behaves like a mirror
/// rather than showing the raw sensor view.
pub fn resolve_rotation(mount_angle: u32, facing: Facing, display: DisplayRotation) -> u32 {
    let mount = mount_angle % 360;
    let degrees = display.degrees();

    match facing {
        Facing::Front => {
            let result = (mount + degrees) % 360;
            (360 - result) % 360
        }
        Facing::Back => (mount + 360 - degrees) % 360,
    }
}

/// [`resolve_rotation`] for a device descriptor
pub fn resolve_for(info: &DeviceOrientationInfo, display: DisplayRotation) -> u32 {
    resolve_rotation(info.mount_angle, info.facing, display)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROTATIONS: [DisplayRotation; 4] = [
        DisplayRotation::Rot0,
        DisplayRotation::Rot90,
        DisplayRotation::Rot180,
        DisplayRotation::Rot270,
    ];

    #[test]
    fn test_known_cases() {
        assert_eq!(resolve_rotation(90, Facing::Back, DisplayRotation::Rot0), 90);
        assert_eq!(resolve_rotation(90, Facing::Front, DisplayRotation::Rot0), 270);
        assert_eq!(resolve_rotation(0, Facing::Back, DisplayRotation::Rot90), 270);
        assert_eq!(resolve_rotation(270, Facing::Front, DisplayRotation::Rot90), 0);
        assert_eq!(resolve_rotation(90, Facing::Back, DisplayRotation::Rot270), 180);
    }

    #[test]
    fn test_always_in_range() {
        for mount in (0..720).step_by(15) {
            for facing in [Facing::Front, Facing::Back] {
                for display in ROTATIONS {
                    let r = resolve_rotation(mount, facing, display);
                    assert!(r < 360, "{mount} {facing} {display} -> {r}");
                }
            }
        }
    }

    #[test]
    fn test_front_mirror_undoes_itself() {
        for mount in [0, 90, 180, 270] {
            for display in ROTATIONS {
                let mirrored = resolve_rotation(mount, Facing::Front, display);
                assert_eq!((360 - mirrored) % 360, (mount + display.degrees()) % 360);
            }
        }
    }

    #[test]
    fn test_resolve_for_descriptor() {
        let info = DeviceOrientationInfo {
            mount_angle: 270,
            facing: Facing::Back,
        };
        assert_eq!(resolve_for(&info, DisplayRotation::Rot180), 90);
    }
}
