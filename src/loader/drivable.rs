/// Overpass QL filter selecting ways a car may drive on.
/// Kept in step with [`is_drivable`]: every regex is anchored so it only
/// matches whole tag values.
pub const OVERPASS_FILTER: &str = concat!(
    r#"["highway"]["area"!~"^yes$"]"#,
    r#"["highway"!~"^(abandoned|bridleway|bus_guideway|construction|corridor|cycleway|elevator|escalator|footway|no|path|pedestrian|planned|platform|proposed|raceway|razed|service|steps|track)$"]"#,
    r#"["motor_vehicle"!~"^no$"]["motorcar"!~"^no$"]["access"!~"^private$"]"#,
    r#"["service"!~"^(alley|driveway|emergency_access|parking|parking_aisle|private)$"]"#,
);

/// Returns true when the tags of a way describe a public road for cars.
/// Inferred from https://wiki.openstreetmap.org/wiki/Map_features
pub fn is_drivable<'a>(tags: impl IntoIterator<Item = (&'a str, &'a str)>) -> bool {
    let mut highway = false;

    for tag in tags {
        match tag {
            ("highway", value) if excluded_highway(value) => return false,
            ("highway", _) => {
                highway = true;
            }
            ("area", "yes")
            | ("motor_vehicle", "no")
            | ("motorcar", "no")
            | ("access", "private") => return false,
            (
                "service",
                "alley" | "driveway" | "emergency_access" | "parking" | "parking_aisle" | "private",
            ) => return false,
            _ => {}
        }
    }

    highway
}

fn excluded_highway(value: &str) -> bool {
    matches!(
        value,
        "abandoned"
            | "bridleway"
            | "bus_guideway"
            | "construction"
            | "corridor"
            | "cycleway"
            | "elevator"
            | "escalator"
            | "footway"
            | "no"
            | "path"
            | "pedestrian"
            | "planned"
            | "platform"
            | "proposed"
            | "raceway"
            | "razed"
            | "service"
            | "steps"
            | "track"
    )
}
