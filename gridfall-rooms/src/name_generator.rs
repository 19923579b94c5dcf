/// Display name generation for players who do not pick one themselves
use markov_namegen::{CharacterChainGenerator, RandomTextGenerator};

/// Training corpus for the name chain, arcade-flavored handles
const TRAINING_NAMES: &[&str] = &[
    "Blitz", "Nova", "Vector", "Pixel", "Quasar", "Zenith", "Rocket", "Comet",
    "Falcon", "Viper", "Cobra", "Lynx", "Panther", "Raptor", "Condor", "Kestrel",
    "Ember", "Frost", "Storm", "Bolt", "Spark", "Blaze", "Shadow", "Echo",
    "Magnus", "Astrid", "Ragnar", "Freya", "Bjorn", "Sigrid", "Eirik", "Ingrid",
    "Orion", "Luna", "Atlas", "Selene", "Phoenix", "Aurora", "Apollo", "Diana",
    "Rook", "Gambit", "Tempo", "Combo", "Stack", "Drift", "Pivot", "Cascade",
];

fn create_name_generator() -> CharacterChainGenerator {
    CharacterChainGenerator::builder()
        .with_order(2)
        .with_prior(0.01)
        .train(TRAINING_NAMES.iter().copied())
        .build()
}

/// Generate a pronounceable random display name
pub fn generate_random_name() -> String {
    let generator = create_name_generator();
    let mut rng = rand::rng();
    loop {
        let name = generator.generate_one(&mut rng);
        if !name.is_empty()
            && name.len() <= 12
            && name.chars().all(|c| c.is_alphanumeric())
        {
            return name;
        }
    }
}

/// Random display name with a numeric suffix, e.g. "Nova_42"
pub fn generate_unique_name() -> String {
    let base_name = generate_random_name();
    let suffix: u16 = rand::random::<u16>() % 1000;
    format!("{}_{}", base_name, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_fit_the_room_record() {
        // names land in the wire-shape `name` field as-is, so keep them
        // short and purely alphanumeric
        for _ in 0..20 {
            let name = generate_random_name();
            assert!(!name.is_empty() && name.len() <= 12, "bad name: {:?}", name);
            assert!(name.chars().all(char::is_alphanumeric));
        }
    }

    #[test]
    fn test_unique_name_carries_numeric_suffix() {
        let name = generate_unique_name();
        let (base, suffix) = name.split_once('_').expect("no suffix");
        assert!(base.chars().all(char::is_alphanumeric));
        let n: u16 = suffix.parse().expect("suffix not numeric");
        assert!(n < 1000);
    }

    #[test]
    fn test_opponents_rarely_share_a_name() {
        let names: HashSet<String> = (0..16).map(|_| generate_unique_name()).collect();
        assert!(names.len() > 8);
    }
}
