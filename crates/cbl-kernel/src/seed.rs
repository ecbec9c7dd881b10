//! First-run sample catalog, used by the simulator binary and as handy seed
//! data in tests.

use chrono::Utc;

use crate::types::{Resource, ResourceId};

fn resource(id: &str, name: &str, category: &str, description: &str, capacity: u32) -> Resource {
    Resource {
        id: ResourceId::new(id),
        name: name.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        capacity,
        created_at: Utc::now(),
    }
}

/// A small mixed catalog: a few date-sliced loaner items and a few
/// whole-pool event seats.
pub fn sample_resources() -> Vec<Resource> {
    vec![
        resource("eq_1", "Canon EOS 90D", "Camera", "DSLR body with kit lens", 3),
        resource("eq_2", "Sony A7III Kit", "Camera", "Full-frame mirrorless kit", 2),
        resource("eq_3", "MacBook Pro 16\"", "Computing", "Loaner laptop", 5),
        resource("eq_4", "Epson Projector", "Other", "Portable projector", 1),
        resource(
            "evt_1",
            "Tech Quiz Championship",
            "Technical",
            "Quiz competition covering programming and algorithms",
            50,
        ),
        resource(
            "evt_2",
            "Cultural Dance Performance",
            "Cultural",
            "Classical, contemporary and folk dance showcase",
            30,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_ids_are_unique() {
        let resources = sample_resources();
        for (i, a) in resources.iter().enumerate() {
            for b in &resources[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }
}
