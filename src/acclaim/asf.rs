use crate::{
    animation::skeleton::{
        Channel, JointDescriptor, Limit, RootInfo, Skeleton, SkeletonHeader, Units,
    },
    engine::{
        assets::{AssetError, AssetLoadContext, AssetType},
        transform::{AngleUnit, RotationOrder},
    },
    error::MocapError,
};

use super::text::{Line, LineReader};

/// Parse the text of an Acclaim skeleton (`.asf`) file.
///
/// Nothing is returned unless the whole file is valid; a partial skeleton would pose wrongly
/// for every frame.
pub fn parse_skeleton(text: &str) -> Result<Skeleton, MocapError> {
    let mut reader = LineReader::new(text);
    let mut header = SkeletonHeader::default();
    let mut bones: Option<Vec<(usize, JointDescriptor)>> = None;
    let mut hierarchy: Option<Vec<Line>> = None;

    while let Some(line) = reader.next() {
        match line.key() {
            ":version" => header.version = line.params().first().map(|s| s.to_string()),
            ":name" => header.name = line.params().first().map(|s| s.to_string()),
            ":units" => header.units = parse_units(&mut reader)?,
            ":documentation" => {
                while let Some(line) = reader.next_in_section() {
                    header.documentation.push(line.raw.to_string());
                }
            }
            ":root" => header.root = parse_root(&mut reader, line.number)?,
            ":bonedata" => bones = Some(parse_bone_data(&mut reader)?),
            ":hierarchy" => hierarchy = Some(parse_hierarchy(&mut reader, line.number)?),
            key if line.is_section() => {
                tracing::debug!("Skipping unknown skeleton section {key} (line {})", line.number);
                while reader.next_in_section().is_some() {}
            }
            key => tracing::warn!("Ignoring `{key}` outside of a section (line {})", line.number),
        }
    }

    let bones = bones.ok_or(MocapError::MissingSection(":bonedata"))?;
    let hierarchy = hierarchy.ok_or(MocapError::MissingSection(":hierarchy"))?;

    // `:units` may follow `:bonedata`, so angles are only normalized once everything is read.
    let angle = header.units.angle;
    let mut skeleton = Skeleton::new(header);
    for (line, mut descriptor) in bones {
        normalize_angles(&mut descriptor, angle);
        let name = descriptor.name.clone();
        if skeleton.add_joint(descriptor).is_none() {
            return Err(MocapError::DuplicateJoint { name, line });
        }
    }

    for line in hierarchy {
        let resolve = |name: &str| {
            skeleton
                .handle(name)
                .ok_or_else(|| MocapError::UnresolvedHierarchyReference {
                    name: name.to_string(),
                    line: line.number,
                })
        };
        let parent = resolve(line.key())?;
        let children = line
            .params()
            .iter()
            .map(|name| resolve(*name))
            .collect::<Result<Vec<_>, _>>()?;

        for child in children {
            skeleton
                .attach(parent, child)
                .map_err(|reason| MocapError::InvalidHierarchy {
                    line: line.number,
                    reason,
                })?;
        }
    }

    for orphan in skeleton.orphans() {
        tracing::warn!("Joint `{orphan}` is not connected to `{}`", Skeleton::ROOT);
    }

    tracing::info!(
        "Parsed skeleton {} with {} joints",
        skeleton.header().name.as_deref().unwrap_or("<unnamed>"),
        skeleton.len()
    );

    Ok(skeleton)
}

impl AssetType for Skeleton {
    fn from_raw(raw: &[u8], context: &AssetLoadContext) -> Result<Self, AssetError> {
        parse_skeleton(context.text(raw)?).map_err(|err| context.mocap_error(err))
    }
}

fn parse_units(reader: &mut LineReader) -> Result<Units, MocapError> {
    let mut units = Units::default();

    while let Some(line) = reader.next_in_section() {
        match line.key() {
            "mass" => units.mass = line.float(1).unwrap_or(units.mass),
            "length" => units.length = line.float(1).unwrap_or(units.length),
            "angle" => {
                let value = line.params().first().copied().unwrap_or_default();
                units.angle = value.parse().map_err(|_| {
                    MocapError::malformed_block(line.number, format!("unknown angle unit `{value}`"))
                })?;
            }
            key => tracing::debug!("Ignoring unit `{key}` (line {})", line.number),
        }
    }

    Ok(units)
}

fn parse_root(reader: &mut LineReader, section_line: usize) -> Result<RootInfo, MocapError> {
    let mut root = RootInfo::default();

    while let Some(line) = reader.next_in_section() {
        match line.key() {
            "order" => {
                let mut order = Vec::with_capacity(6);
                for tag in line.params() {
                    let channel = tag.parse::<Channel>().map_err(|_| {
                        MocapError::malformed_block(line.number, format!("unknown root channel `{tag}`"))
                    })?;
                    if order.contains(&channel) {
                        return Err(MocapError::malformed_block(
                            line.number,
                            format!("root channel `{channel}` is listed twice"),
                        ));
                    }
                    order.push(channel);
                }
                root.order = order;
            }
            "axis" => {
                let value = line.params().first().copied().unwrap_or_default();
                root.axis = value.parse().map_err(|_| {
                    MocapError::malformed_block(line.number, format!("unknown rotation order `{value}`"))
                })?;
            }
            "position" => {
                root.position = line.vec3(1).ok_or_else(|| {
                    MocapError::malformed_block(line.number, "`position` needs three numbers")
                })?;
            }
            "orientation" => {
                root.orientation = line.vec3(1).ok_or_else(|| {
                    MocapError::malformed_block(line.number, "`orientation` needs three numbers")
                })?;
            }
            key => tracing::debug!("Ignoring root field `{key}` (line {})", line.number),
        }
    }

    if root.order.is_empty() {
        return Err(MocapError::malformed_block(section_line, "`:root` has an empty `order`"));
    }

    Ok(root)
}

fn parse_bone_data(reader: &mut LineReader) -> Result<Vec<(usize, JointDescriptor)>, MocapError> {
    let mut bones = Vec::new();

    while let Some(line) = reader.next_in_section() {
        match line.key() {
            "begin" => bones.push((line.number, parse_bone(reader, line.number)?)),
            key => {
                return Err(MocapError::malformed_block(
                    line.number,
                    format!("expected `begin`, found `{key}`"),
                ));
            }
        }
    }

    Ok(bones)
}

/// Reads one `begin` ... `end` block. `axis` and `limits` are left in the file's angle unit.
fn parse_bone(reader: &mut LineReader, begin: usize) -> Result<JointDescriptor, MocapError> {
    let mut id = None;
    let mut name = None;
    let mut direction = None;
    let mut length = None;
    let mut axis = None;
    let mut axis_order = RotationOrder::default();
    let mut dof = Vec::new();
    let mut limits = Vec::new();

    loop {
        let Some(line) = reader.next_in_section() else {
            return Err(MocapError::malformed_block(begin, "block is missing `end`"));
        };

        match line.key() {
            "end" => break,
            "id" => id = line.params().first().and_then(|s| s.parse().ok()),
            "name" => name = line.params().first().map(|s| s.to_string()),
            "direction" => {
                direction = Some(line.vec3(1).ok_or_else(|| {
                    MocapError::malformed_block(line.number, "`direction` needs three numbers")
                })?);
            }
            "length" => {
                length = Some(line.float(1).ok_or_else(|| {
                    MocapError::malformed_block(line.number, "`length` needs a number")
                })?);
            }
            "axis" => {
                axis = Some(line.vec3(1).ok_or_else(|| {
                    MocapError::malformed_block(line.number, "`axis` needs three numbers")
                })?);
                if let Some(order) = line.tokens.get(4) {
                    axis_order = order.parse().map_err(|_| {
                        MocapError::malformed_block(
                            line.number,
                            format!("unknown rotation order `{order}`"),
                        )
                    })?;
                }
            }
            "dof" => {
                for tag in line.params() {
                    let channel = tag
                        .parse::<Channel>()
                        .ok()
                        .filter(|channel| channel.rotation_axis().is_some())
                        .ok_or_else(|| {
                            MocapError::malformed_block(
                                line.number,
                                format!("unsupported degree of freedom `{tag}`"),
                            )
                        })?;
                    if dof.contains(&channel) {
                        return Err(MocapError::malformed_block(
                            line.number,
                            format!("degree of freedom `{channel}` is listed twice"),
                        ));
                    }
                    dof.push(channel);
                }
            }
            "limits" => {
                limits.push(parse_limit(&line, 1)?);
                // Remaining pairs follow on their own lines.
                while let Some(line) = reader.next_if(|line| line.raw.starts_with('(')) {
                    limits.push(parse_limit(&line, 0)?);
                }
            }
            key => tracing::debug!("Ignoring bone field `{key}` (line {})", line.number),
        }
    }

    let missing = |field: &str| MocapError::malformed_block(begin, format!("missing `{field}`"));
    let name = name.ok_or_else(|| missing("name"))?;
    let direction = direction.ok_or_else(|| missing("direction"))?;
    let length = length.ok_or_else(|| missing("length"))?;
    let axis = axis.ok_or_else(|| missing("axis"))?;

    if !limits.is_empty() && limits.len() != dof.len() {
        return Err(MocapError::malformed_block(
            begin,
            format!(
                "`{name}` declares {} degrees of freedom but {} limits",
                dof.len(),
                limits.len()
            ),
        ));
    }

    Ok(JointDescriptor {
        id,
        name,
        direction,
        length,
        axis,
        axis_order,
        dof,
        limits,
    })
}

fn normalize_angles(descriptor: &mut JointDescriptor, angle: AngleUnit) {
    descriptor.axis = angle.vec3_to_degrees(descriptor.axis);
    for limit in descriptor.limits.iter_mut() {
        limit.min = angle.to_degrees(limit.min);
        limit.max = angle.to_degrees(limit.max);
    }
}

/// Reads a `(min max)` pair starting at token `start`. Unbounded limits are written as `inf`.
fn parse_limit(line: &Line, start: usize) -> Result<Limit, MocapError> {
    let min = line.float(start);
    let max = line.float(start + 1);
    match (min, max) {
        (Some(min), Some(max)) => Ok(Limit { min, max }),
        _ => Err(MocapError::malformed_block(
            line.number,
            "limits need a `(min max)` pair",
        )),
    }
}

fn parse_hierarchy<'a>(
    reader: &mut LineReader<'a>,
    section_line: usize,
) -> Result<Vec<Line<'a>>, MocapError> {
    let invalid = |line: usize, reason: &str| MocapError::InvalidHierarchy {
        line,
        reason: reason.to_string(),
    };

    let Some(begin) = reader.next_in_section() else {
        return Err(invalid(section_line, "expected `begin`"));
    };
    if begin.key() != "begin" {
        return Err(invalid(begin.number, "expected `begin`"));
    }

    let mut lines = Vec::new();
    loop {
        let Some(line) = reader.next_in_section() else {
            return Err(invalid(begin.number, "`begin` without `end`"));
        };
        if line.key() == "end" {
            break;
        }
        lines.push(line);
    }

    // Anything after `end` belongs to no block.
    if let Some(line) = reader.next_in_section() {
        return Err(invalid(line.number, "unexpected line after `end`"));
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::acclaim::fixtures;

    fn bone(body: &str) -> String {
        format!(":bonedata\n  begin\n{body}\n  end\n:hierarchy\n  begin\n  end\n")
    }

    #[test]
    fn parse_fixture() {
        let skeleton = parse_skeleton(fixtures::SKELETON).unwrap();
        let header = skeleton.header();

        assert_eq!(header.version.as_deref(), Some("1.10"));
        assert_eq!(header.name.as_deref(), Some("VICON"));
        assert_eq!(header.units.length, 0.45);
        assert_eq!(header.units.angle, AngleUnit::Degrees);
        assert_eq!(header.documentation.len(), 2);
        assert_eq!(header.root, RootInfo::default());

        assert_eq!(skeleton.len(), 5);
        assert!(skeleton.orphans().is_empty());

        let names = skeleton
            .depth_first()
            .into_iter()
            .map(|handle| skeleton[handle].name())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["root", "lhipjoint", "lfemur", "ltibia", "lowerback"]);

        let femur = skeleton.joint("lfemur").unwrap();
        assert_eq!(femur.descriptor.id, Some(2));
        assert_eq!(femur.descriptor.direction, DVec3::new(0.34202, -0.939693, 0.0));
        assert_eq!(femur.descriptor.length, 7.1578);
        assert_eq!(femur.descriptor.axis, DVec3::new(0.0, 0.0, 20.0));
        assert_eq!(femur.descriptor.dof, vec![Channel::Rx, Channel::Ry, Channel::Rz]);
        assert_eq!(
            femur.descriptor.limits,
            vec![
                Limit { min: -160.0, max: 20.0 },
                Limit { min: -70.0, max: 70.0 },
                Limit { min: -60.0, max: 70.0 },
            ]
        );
        assert_eq!(skeleton[femur.parent().unwrap()].name(), "lhipjoint");

        let tibia = skeleton.handle("ltibia").unwrap();
        assert_eq!(skeleton[skeleton.handle("lfemur").unwrap()].children(), &[tibia]);

        let expected = glam::DMat3::from_rotation_z(20f64.to_radians());
        assert!(femur.axis_matrix().abs_diff_eq(expected, 1e-12));
    }

    #[test]
    fn parsing_is_deterministic() {
        let a = parse_skeleton(fixtures::SKELETON).unwrap();
        let b = parse_skeleton(fixtures::SKELETON).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn required_fields() {
        for field in ["name", "direction", "length", "axis"] {
            let body = [
                "name j",
                "direction 0 1 0",
                "length 1",
                "axis 0 0 0 XYZ",
            ]
            .into_iter()
            .filter(|line| !line.starts_with(field))
            .collect::<Vec<_>>()
            .join("\n");

            let error = parse_skeleton(&bone(&body)).unwrap_err();
            assert_eq!(
                error,
                MocapError::MalformedSkeletonBlock {
                    line: 2,
                    reason: format!("missing `{field}`"),
                }
            );
        }
    }

    #[test]
    fn malformed_fields() {
        let cases = [
            "name j\ndirection 0 1\nlength 1\naxis 0 0 0",
            "name j\ndirection 0 1 0\nlength long\naxis 0 0 0",
            "name j\ndirection 0 1 0\nlength 1\naxis 0 0 0 XYQ",
            "name j\ndirection 0 1 0\nlength 1\naxis 0 0 0\ndof rx tx",
            "name j\ndirection 0 1 0\nlength 1\naxis 0 0 0\ndof rx rx",
            "name j\ndirection 0 1 0\nlength 1\naxis 0 0 0\ndof rx ry\nlimits (-10 10)",
            "name j\ndirection 0 1 0\nlength 1\naxis 0 0 0\ndof rx\nlimits (-10)",
        ];
        for body in cases {
            assert!(
                matches!(
                    parse_skeleton(&bone(body)),
                    Err(MocapError::MalformedSkeletonBlock { .. })
                ),
                "{body}"
            );
        }

        assert!(matches!(
            parse_skeleton(":bonedata\n  begin\n  name j\n:hierarchy\n"),
            Err(MocapError::MalformedSkeletonBlock { line: 2, .. })
        ));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let skeleton = parse_skeleton(&bone(
            "name j\ndirection 0 1 0\nlength 1\naxis 0 0 0\nbodymass 3.0\ncofmass 0.5",
        ))
        .unwrap();
        assert_eq!(skeleton.orphans(), vec!["j"]);
    }

    #[test]
    fn unresolved_hierarchy_reference() {
        let text = fixtures::SKELETON.replace("lfemur ltibia", "lfemur ltibia rtibia");
        assert!(matches!(
            parse_skeleton(&text),
            Err(MocapError::UnresolvedHierarchyReference { name, .. }) if name == "rtibia"
        ));
    }

    #[test]
    fn invalid_hierarchy() {
        let text = fixtures::SKELETON.replace("lfemur ltibia", "lfemur ltibia\n    lowerback ltibia");
        assert!(matches!(
            parse_skeleton(&text),
            Err(MocapError::InvalidHierarchy { .. })
        ));

        let text = fixtures::SKELETON.replace(
            "    lfemur ltibia\n",
            "    lowerback ltibia\n    ltibia lowerback\n",
        );
        let text = text.replace("root lhipjoint lowerback", "root lhipjoint");
        assert_eq!(
            parse_skeleton(&text),
            Err(MocapError::InvalidHierarchy {
                line: 61,
                reason: "`ltibia` -> `lowerback` would form a cycle".to_string(),
            })
        );

        let text = fixtures::SKELETON.replace("lfemur ltibia", "lfemur ltibia root");
        assert!(matches!(
            parse_skeleton(&text),
            Err(MocapError::InvalidHierarchy { .. })
        ));

        let text = fixtures::SKELETON.replace("  end\n", "");
        assert!(parse_skeleton(&text).is_err());
    }

    #[test]
    fn duplicate_joint() {
        let text = fixtures::SKELETON.replace("name ltibia", "name lfemur");
        assert!(matches!(
            parse_skeleton(&text),
            Err(MocapError::DuplicateJoint { name, .. }) if name == "lfemur"
        ));
    }

    #[test]
    fn orphans_are_kept() {
        let text = fixtures::SKELETON.replace("    lfemur ltibia\n", "");
        let skeleton = parse_skeleton(&text).unwrap();
        assert_eq!(skeleton.orphans(), vec!["ltibia"]);
        assert!(skeleton.joint("ltibia").unwrap().parent().is_none());
    }

    #[test]
    fn missing_sections() {
        assert_eq!(
            parse_skeleton(":hierarchy\n  begin\n  end\n"),
            Err(MocapError::MissingSection(":bonedata"))
        );
        assert_eq!(
            parse_skeleton(":bonedata\n"),
            Err(MocapError::MissingSection(":hierarchy"))
        );
    }

    #[test]
    fn radians_are_normalized() {
        let text = format!(
            ":units\n  angle rad\n{}",
            bone("name j\ndirection 0 1 0\nlength 1\naxis 0 0 1.5707963267948966\ndof rz\nlimits (-3.141592653589793 0)")
        );
        let skeleton = parse_skeleton(&text).unwrap();
        let joint = skeleton.joint("j").unwrap();
        assert!((joint.descriptor.axis.z - 90.0).abs() < 1e-9);
        assert!((joint.descriptor.limits[0].min + 180.0).abs() < 1e-9);

        let text = format!(
            "{}:units\n  angle rad\n",
            bone("name j\ndirection 0 1 0\nlength 1\naxis 0 0 1.5707963267948966\ndof rz\nlimits (-3.141592653589793 0)")
        );
        let late = parse_skeleton(&text).unwrap();
        assert_eq!(late.header().units.angle, AngleUnit::Radians);
        assert_eq!(late.joint("j").unwrap().descriptor, joint.descriptor);
    }

    #[test]
    fn custom_root() {
        let text = format!(
            ":root\n  order RX RY RZ TX TY TZ\n  axis ZYX\n  position 1 2 3\n  orientation 0 0 0\n{}",
            bone("name j\ndirection 0 1 0\nlength 1\naxis 0 0 0")
        );
        let skeleton = parse_skeleton(&text).unwrap();
        let root = &skeleton.header().root;
        assert_eq!(root.order[0], Channel::Rx);
        assert_eq!(root.order[5], Channel::Tz);
        assert_eq!(root.axis, RotationOrder::Zyx);
        assert_eq!(root.position, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(
            skeleton[skeleton.root()].descriptor.axis_order,
            RotationOrder::Zyx
        );

        assert!(matches!(
            parse_skeleton(":root\n  order TX TX\n"),
            Err(MocapError::MalformedSkeletonBlock { line: 2, .. })
        ));
    }
}
