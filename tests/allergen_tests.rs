//! # Allergen and Filter Tests
//!
//! Classification over the default vocabulary, plus the quality filter that
//! runs right before it.

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use menu_pipeline::allergens::AllergenClassifier;
    use menu_pipeline::config::PipelineConfig;
    use menu_pipeline::dish_model::{Allergen, Dish};
    use menu_pipeline::quality_filter::QualityFilter;
    use menu_pipeline::similarity::FuzzyThresholds;

    fn classifier() -> AllergenClassifier {
        AllergenClassifier::from_config(&PipelineConfig::default()).unwrap()
    }

    #[test]
    fn test_margherita() {
        let tags = classifier().classify(&["mozzarella", "pomodoro", "basilico"], "pizza", "Pizza Margherita");
        assert_eq!(tags, BTreeSet::from([Allergen::Gluten, Allergen::Milk]));
    }

    #[test]
    fn test_every_keyword_tags_its_allergen() {
        let config = PipelineConfig::default();
        let c = classifier();
        for (tag, keywords) in &config.allergens.keywords {
            let tag: Allergen = tag.parse().unwrap();
            for keyword in keywords {
                let tags = c.classify(&[keyword.as_str()], "salad", "");
                assert!(tags.contains(&tag), "'{keyword}' should tag {tag}");
            }
        }
    }

    #[test]
    fn test_fast_path_types() {
        let c = classifier();
        let none: [&str; 0] = [];
        for dish_type in ["pizza", "pasta", "hamburger", "kebab", "flatbread"] {
            assert!(c.classify(&none, dish_type, "").contains(&Allergen::Gluten), "{dish_type}");
        }
        for dish_type in ["fish", "sushi"] {
            assert!(c.classify(&none, dish_type, "").contains(&Allergen::Fish), "{dish_type}");
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        let c = classifier();
        let ingredients = ["salmone", "riso", "salsa di soia", "sesamo"];
        let first = c.classify(&ingredients, "poke", "Poke salmone");
        for _ in 0..5 {
            assert_eq!(c.classify(&ingredients, "poke", "Poke salmone"), first);
        }
        assert!(first.contains(&Allergen::Fish));
        assert!(first.contains(&Allergen::Soy));
        assert!(first.contains(&Allergen::Sesame));
    }

    #[test]
    fn test_custom_vocabulary() {
        let mut keywords = BTreeMap::new();
        keywords.insert("tree nuts".to_string(), vec!["pistacchio".to_string()]);
        let rules: BTreeMap<String, Vec<Allergen>> = BTreeMap::new();
        let c = AllergenClassifier::new(&keywords, &rules, FuzzyThresholds::default()).unwrap();

        let tags = c.classify(&["granella di pistacchio"], "dessert", "Cannolo");
        assert_eq!(tags, BTreeSet::from([Allergen::TreeNuts]));
        assert!(c.classify(&["mozzarella"], "pizza", "").is_empty());
    }

    #[test]
    fn test_filter_then_classify() {
        let config = PipelineConfig::default();
        let filter = QualityFilter::from_config(&config);
        let dishes = vec![
            Dish::new("Insalata di tonno", "Da Gino")
                .with_dish_type("salad")
                .with_ingredients(["lattuga", "tonno"]),
            Dish::new("Acqua naturale", "Da Gino")
                .with_dish_type("beverage")
                .with_ingredients(["acqua"]),
            Dish::new("Combo pranzo", "Da Gino")
                .with_dish_type("hamburger")
                .with_ingredients(["hamburger", "patatine"]),
        ];
        let (mut kept, stats) = filter.partition(dishes);
        assert_eq!(kept.len(), 1);
        assert_eq!(stats.excluded(), 2);

        classifier().enrich(&mut kept);
        assert_eq!(kept[0].allergens, BTreeSet::from([Allergen::Fish]));
    }
}
