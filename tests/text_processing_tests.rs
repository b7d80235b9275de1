#[cfg(test)]
mod tests {
    use menu_pipeline::dish_model::IngredientField;
    use menu_pipeline::similarity::{full_ratio, partial_ratio, FuzzyMatcher, MatchKind};
    use menu_pipeline::text_processing::{
        clean_ingredients, extract_keywords, fold_diacritics, normalize_text, tokenize_ingredients,
    };

    #[test]
    fn test_normalize_text_unifies_apostrophes() {
        assert_eq!(normalize_text("  Pizza   Margherita D’Autore "), "pizza margherita d'autore");
        assert_eq!(normalize_text("!!!"), "");
    }

    #[test]
    fn test_fold_diacritics() {
        assert_eq!(fold_diacritics("Città Studi, Viale Lombardia"), "Citta Studi, Viale Lombardia");
    }

    #[test]
    fn test_tokenize_comma_delimited_string() {
        let field = IngredientField::from("Pomodoro, Mozzarella ,, Basilico");
        assert_eq!(tokenize_ingredients(&field), vec!["pomodoro", "mozzarella", "basilico"]);
    }

    #[test]
    fn test_tokenize_odd_json_values() {
        let field: IngredientField = serde_json::from_str(r#"["uova", 3, null]"#).unwrap();
        assert_eq!(tokenize_ingredients(&field), vec!["uova", "3"]);

        let field: IngredientField = serde_json::from_str("null").unwrap();
        assert!(tokenize_ingredients(&field).is_empty());

        let field: IngredientField = serde_json::from_str(r#"{"a": 1}"#).unwrap();
        assert!(tokenize_ingredients(&field).is_empty());
    }

    #[test]
    fn test_clean_ingredients_drops_placeholders() {
        let field = IngredientField::from(
            ["  Farina ", "Non specificato", "---", "x", "Uova"]
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>(),
        );
        assert_eq!(clean_ingredients(&field), vec!["Farina", "Uova"]);
    }

    #[test]
    fn test_extract_keywords_connectives() {
        assert_eq!(
            extract_keywords("Spaghetti alla carbonara - guanciale\npecorino"),
            vec!["spaghetti", "carbonara", "guanciale", "pecorino"]
        );
        assert!(extract_keywords("").is_empty());
    }

    #[test]
    fn test_ratio_values() {
        assert_eq!(full_ratio("bevanda", "bevande"), 85);
        assert_eq!(full_ratio("crea", "crema"), 88);
        assert_eq!(full_ratio("mozzarela", "mozzarella"), 94);
        assert_eq!(full_ratio("", ""), 100);
        assert_eq!(partial_ratio("latte", "lattuga"), 88);
        assert_eq!(partial_ratio("", "pane"), 0);
    }

    #[test]
    fn test_matcher_kinds() {
        let matcher = FuzzyMatcher::default();
        assert_eq!(
            matcher.match_keyword("burrata pugliese", "burrata").map(|(_, kind)| kind),
            Some(MatchKind::Exact)
        );
        assert_eq!(
            matcher.match_keyword("gamberi in tempura", "gambero").map(|(_, kind)| kind),
            Some(MatchKind::Partial)
        );
        assert!(matcher.match_keyword("pane", "").is_none());
        assert!(matcher.match_keyword("riso", "salmone").is_none());
    }
}
