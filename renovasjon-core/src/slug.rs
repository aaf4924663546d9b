//! Category names cross into MQTT topics and unique ids here, so the mapping
//! is an explicit table rather than ad-hoc string edits.

/// Replacements for letters that are not bus-safe as-is.
pub const DIACRITICS: &[(char, &str)] = &[
    ('å', "a"),
    ('Å', "a"),
    ('æ', "ae"),
    ('Æ', "ae"),
    ('ø', "o"),
    ('Ø', "o"),
    ('ä', "a"),
    ('Ä', "a"),
    ('ö', "o"),
    ('Ö', "o"),
    ('ü', "u"),
    ('Ü', "u"),
    ('é', "e"),
    ('É', "e"),
    ('è', "e"),
    ('È', "e"),
];

const SEPARATOR: char = '_';

/// Map a category name to a lower-case identifier made of `[a-z0-9_]`.
///
/// ASCII letters are lower-cased and digits kept. Letters listed in
/// [`DIACRITICS`] use their replacement; anything else becomes `_`.
#[must_use]
pub fn sensor_id(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    for character in name.trim().chars() {
        if character.is_ascii_alphanumeric() {
            id.push(character.to_ascii_lowercase());
        } else if let Some((_, replacement)) = DIACRITICS
            .iter()
            .find(|(letter, _)| *letter == character)
        {
            id.push_str(replacement);
        } else {
            id.push(SEPARATOR);
        }
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_categories_are_lower_cased() {
        assert_eq!(sensor_id("Matavfall"), "matavfall");
        assert_eq!(sensor_id("Papir"), "papir");
        assert_eq!(sensor_id("Restavfall"), "restavfall");
    }

    #[test]
    fn every_table_entry_is_applied() {
        for (letter, replacement) in DIACRITICS {
            assert_eq!(
                sensor_id(&letter.to_string()),
                *replacement,
                "mapping for {letter}"
            );
        }
    }

    #[test]
    fn table_output_is_bus_safe() {
        for (_, replacement) in DIACRITICS {
            assert!(
                replacement.chars().all(|ch| ch.is_ascii_lowercase()),
                "{replacement} must be lower-case ascii"
            );
        }
    }

    #[test]
    fn norwegian_names_map_deterministically() {
        assert_eq!(sensor_id("Glass- og metallemballasje"), "glass__og_metallemballasje");
        assert_eq!(sensor_id("Plastemballasje"), "plastemballasje");
        assert_eq!(sensor_id("Hageavfall Å"), "hageavfall_a");
        assert_eq!(sensor_id("Bleieåvfall"), "bleieavfall");
        assert_eq!(sensor_id("Tømming"), "tomming");
        assert_eq!(sensor_id("Særavfall"), "saeravfall");
    }

    #[test]
    fn unknown_characters_become_separators() {
        assert_eq!(sensor_id("Papp/Papir"), "papp_papir");
        assert_eq!(sensor_id("Ñandú"), "_and_");
        assert_eq!(sensor_id("  Rest 2  "), "rest_2");
    }
}
