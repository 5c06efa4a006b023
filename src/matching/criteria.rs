// src/matching/criteria.rs - Dosage form, route and strength compatibility for candidate pairs
use crate::matching::candidates::{PreparedBrand, PreparedGeneric};
use crate::matching::normalize::has_overlap;
use crate::models::matching::CriteriaFlags;

/// A same-ingredient (brand, generic) association under evaluation.
#[derive(Debug, Clone, Copy)]
pub struct CandidatePair<'p, 'a> {
    pub brand: &'p PreparedBrand<'a>,
    pub generic: &'p PreparedGeneric<'a>,
}

impl<'p, 'a> CandidatePair<'p, 'a> {
    pub fn new(brand: &'p PreparedBrand<'a>, generic: &'p PreparedGeneric<'a>) -> Self {
        Self { brand, generic }
    }

    pub fn evaluate(&self) -> CriteriaFlags {
        evaluate(self.brand, self.generic)
    }
}

/// Computes all three flags independently. The pair is kept only when all pass.
pub fn evaluate(brand: &PreparedBrand<'_>, generic: &PreparedGeneric<'_>) -> CriteriaFlags {
    CriteriaFlags {
        dosage_form: has_overlap(&brand.dosage_form_tokens, &generic.dosage_form_tokens),
        route: has_overlap(&brand.route_tokens, &generic.route_tokens),
        strength: strength_compatible(
            &brand.strength_tokens,
            &brand.strength_norm,
            &generic.strength_norm,
        ),
    }
}

/// Generic strength is one of the brand's declared strengths, or appears
/// inside the brand's concatenated declaration.
///
/// The containment check is textual: "10MG" is found within "110MG".
pub fn strength_compatible(
    brand_tokens: &[String],
    brand_norm: &str,
    generic_norm: &str,
) -> bool {
    if generic_norm.is_empty() {
        return false;
    }
    let in_list = brand_tokens.iter().any(|token| token == generic_norm);
    let contained = !brand_norm.is_empty() && brand_norm.contains(generic_norm);
    in_list || contained
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::normalize::{normalize_strength, tokenize_strength_list};
    use crate::models::applications::{BrandApplication, GenericApplication};

    fn check_strength(brand: &str, generic: &str) -> bool {
        strength_compatible(
            &tokenize_strength_list(brand),
            &normalize_strength(brand),
            &normalize_strength(generic),
        )
    }

    #[test]
    fn test_strength_found_in_brand_list() {
        assert!(check_strength("10 mg | 20 mg | 40 mg", "20mg"));
        assert!(check_strength("['10MG', '20MG']", "10 MG"));
        assert!(!check_strength("10 mg | 20 mg | 40 mg", "80mg"));
    }

    #[test]
    fn test_strength_found_in_concatenated_declaration() {
        assert!(check_strength("5MG/ML 10MG/ML", "10mg/ml"));
    }

    #[test]
    fn test_substring_fallback_matches_unrelated_strength() {
        // 10MG is textually contained in 110MG; the containment check accepts it.
        assert!(check_strength("110 mg", "10 mg"));
    }

    #[test]
    fn test_empty_strength_never_compatible() {
        assert!(!check_strength("10 mg", ""));
        assert!(!check_strength("", "10 mg"));
        assert!(!check_strength("", ""));
    }

    #[test]
    fn test_units_are_not_interchangeable() {
        assert!(!check_strength("10 mcg", "10 mg"));
    }

    #[test]
    fn test_evaluate_flags_independently() {
        let brand = BrandApplication {
            application_number: "020702".to_string(),
            ingredient: "ATORVASTATIN CALCIUM".to_string(),
            strength: "10 mg | 20 mg | 40 mg".to_string(),
            dosage_form: "TABLET".to_string(),
            route: "ORAL".to_string(),
            ..Default::default()
        };
        let generic = GenericApplication {
            application_number: "076477".to_string(),
            ingredient: "ATORVASTATIN CALCIUM".to_string(),
            strength: "20mg".to_string(),
            dosage_form: "TABLET, FILM COATED".to_string(),
            route: "".to_string(),
            ..Default::default()
        };
        let pb = PreparedBrand::new(&brand);
        let pg = PreparedGeneric::new(&generic);
        let flags = CandidatePair::new(&pb, &pg).evaluate();

        assert!(flags.dosage_form);
        assert!(!flags.route);
        assert!(flags.strength);
        assert!(!flags.all_pass());
    }
}
