#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use menu_pipeline::config::DedupConfig;
    use menu_pipeline::dedup::Deduplicator;
    use menu_pipeline::dish_model::{Allergen, Dish};

    fn lenient() -> Deduplicator {
        Deduplicator::new(DedupConfig::default().lenient_rule())
    }

    fn type_aware() -> Deduplicator {
        Deduplicator::new(DedupConfig::default().type_aware_rule())
    }

    fn carbonara_pair() -> Vec<Dish> {
        vec![
            Dish::new("Spaghetti alla Carbonara", "Trattoria Milanese")
                .with_dish_type("pasta")
                .with_ingredients(["spaghetti", "guanciale", "uova", "pecorino"])
                .with_allergens([Allergen::Gluten, Allergen::Eggs, Allergen::Milk]),
            Dish::new("Spaghetti Carbonara", "Osteria del Borgo")
                .with_dish_type("pasta")
                .with_ingredients(["Spaghetti", "Guanciale", "Uova", "Pecorino", "Pepe"])
                .with_allergens([Allergen::Gluten, Allergen::Eggs]),
        ]
    }

    #[test]
    fn test_carbonara_variants_merge() {
        let dishes = carbonara_pair();
        let clusters = lenient().cluster(&dishes);
        assert_eq!(clusters.len(), 1);

        let cluster = &clusters[0];
        assert_eq!(cluster.name, "Spaghetti alla Carbonara");
        assert_eq!(cluster.ingredients, vec!["guanciale", "pecorino", "pepe", "spaghetti", "uova"]);
        assert_eq!(
            cluster.allergens,
            BTreeSet::from([Allergen::Eggs, Allergen::Gluten, Allergen::Milk])
        );
        assert_eq!(cluster.member_ids, vec![dishes[0].id.clone(), dishes[1].id.clone()]);
    }

    #[test]
    fn test_type_aware_rule_is_stricter() {
        // name similarity 88 is below the type-aware threshold
        assert_eq!(type_aware().cluster(&carbonara_pair()).len(), 2);
    }

    #[test]
    fn test_type_aware_requires_same_type() {
        let dishes = vec![
            Dish::new("Tagliata", "A").with_dish_type("meat").with_ingredients(["manzo", "rucola"]),
            Dish::new("Tagliata", "B").with_dish_type("salad").with_ingredients(["manzo", "rucola"]),
        ];
        assert_eq!(type_aware().cluster(&dishes).len(), 2);
        assert_eq!(lenient().cluster(&dishes).len(), 1);
    }

    #[test]
    fn test_reclustering_keeps_count() {
        // holds here because no cluster grows after rejecting a dish
        let dishes = vec![
            Dish::new("Margherita", "A").with_dish_type("pizza").with_ingredients(["mozzarella", "pomodoro"]),
            Dish::new("Margherita", "B").with_dish_type("pizza").with_ingredients(["pomodoro", "mozzarella"]),
            Dish::new("Carbonara", "A").with_dish_type("pasta").with_ingredients(["guanciale", "uova"]),
            Dish::new("Tiramisù", "A").with_dish_type("dessert").with_ingredients(["mascarpone", "caffè"]),
        ];
        let dedup = lenient();
        let first = dedup.cluster(&dishes);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].member_ids.len(), 2);

        let second = dedup.cluster(&first);
        assert_eq!(second.len(), first.len());
        assert_eq!(second[0].member_ids, first[0].member_ids);
    }

    #[test]
    fn test_reclustering_merges_cluster_that_grew() {
        // "rosso" is rejected by the first cluster (name 82, no shared
        // ingredient), which then absorbs pinoli and aglio from the third dish
        let dishes = vec![
            Dish::new("Pasta al pesto", "A").with_ingredients(["basilico"]),
            Dish::new("Pasta al pesto rosso", "B").with_ingredients(["pinoli", "aglio"]),
            Dish::new("Pasta al pesto", "C").with_ingredients(["pinoli", "aglio"]),
        ];
        let dedup = lenient();
        let first = dedup.cluster(&dishes);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].ingredients, vec!["aglio", "basilico", "pinoli"]);

        let second = dedup.cluster(&first);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].member_ids.len(), 3);
    }

    #[test]
    fn test_empty_input() {
        let none: Vec<Dish> = Vec::new();
        assert!(lenient().cluster(&none).is_empty());
    }
}
