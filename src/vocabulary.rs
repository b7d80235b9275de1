//! # Default Vocabularies
//!
//! Built-in dictionaries used when the configuration file does not override
//! them: allergen keywords, dish-type rules, the exclusion vocabulary,
//! nutrition tables and the Milan locality lists. Keywords are Italian because
//! the scraped menus are; tags are English.

use std::collections::BTreeMap;

use crate::dish_model::Allergen;
use crate::dish_type::DishTypeRule;

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

/// Keyword variants per allergen tag
pub fn allergen_keywords() -> BTreeMap<String, Vec<String>> {
    let mut map = BTreeMap::new();
    let mut insert = |tag: Allergen, keywords: Vec<String>| {
        map.insert(tag.as_str().to_string(), keywords);
    };
    insert(
        Allergen::Gluten,
        words(&[
            "glutine", "farina", "pane", "pasta", "pizza", "piadina", "impasto", "frumento",
            "grano", "orzo", "farro", "avena", "segale", "couscous", "hamburger", "panino",
            "focaccia", "bruschetta", "crostino", "toast", "sandwich", "gnocchi", "lasagne",
            "tortellini", "ravioli", "tagliatelle", "spaghetti", "cotoletta", "pastella",
            "impanatura", "cracker", "tigella", "pasta sfoglia", "pasta frolla", "cheesecake",
            "tiramisu", "tiramisù",
        ]),
    );
    insert(
        Allergen::Milk,
        words(&[
            "latte", "formaggio", "parmigiano", "grana", "mozzarella", "gorgonzola", "ricotta",
            "panna", "burro", "besciamella", "yogurt", "stracciatella", "provola",
            "caciocavallo", "burrata", "mascarpone", "stracchino", "fontina", "pecorino",
            "philadelphia", "feta", "gelato", "cheesecake", "tiramisu", "tiramisù",
        ]),
    );
    insert(
        Allergen::Eggs,
        words(&[
            "uova", "uovo", "frittata", "maionese", "crema pasticcera", "carbonara", "cotoletta",
            "cheesecake", "tiramisu", "tiramisù",
        ]),
    );
    insert(
        Allergen::TreeNuts,
        words(&[
            "noci", "nocciole", "mandorle", "pistacchi", "anacardi", "pinoli", "noci pecan",
            "noci macadamia", "crema di nocciole", "nutella", "gianduia",
        ]),
    );
    insert(Allergen::Peanuts, words(&["arachidi", "burro di arachidi", "peanut"]));
    insert(
        Allergen::Fish,
        words(&[
            "pesce", "acciughe", "alici", "tonno", "salmone", "merluzzo", "baccalà", "sgombro",
            "orata", "branzino", "spigola", "anguilla", "sushi",
        ]),
    );
    insert(
        Allergen::Crustaceans,
        words(&["gambero", "gamberi", "aragosta", "scampo", "granchio", "astice", "mazzancolla"]),
    );
    insert(
        Allergen::Molluscs,
        words(&["polpo", "calamaro", "cozze", "vongole", "seppie", "totano"]),
    );
    insert(Allergen::Soy, words(&["soia", "salsa di soia", "tofu", "edamame"]));
    insert(Allergen::Celery, words(&["sedano", "sedano rapa"]));
    insert(Allergen::Lupin, words(&["lupini"]));
    insert(Allergen::Mustard, words(&["senape", "mostarda"]));
    insert(Allergen::Sesame, words(&["sesamo", "semi di sesamo", "tahini", "hummus"]));
    insert(
        Allergen::Sulphites,
        words(&["solfiti", "vino", "aceto di vino", "anidride solforosa"]),
    );
    map
}

/// Dish types that imply an allergen regardless of ingredients
pub fn type_allergen_rules() -> BTreeMap<String, Vec<Allergen>> {
    let mut map = BTreeMap::new();
    for dish_type in ["pizza", "pasta", "hamburger", "kebab", "flatbread"] {
        map.insert(dish_type.to_string(), vec![Allergen::Gluten]);
    }
    for dish_type in ["fish", "sushi"] {
        map.insert(dish_type.to_string(), vec![Allergen::Fish]);
    }
    map
}

/// Ordered dish-type rules; earlier rules win ties
pub fn dish_type_rules() -> Vec<DishTypeRule> {
    vec![
        DishTypeRule::new(
            "pizza",
            &["pizzeria", "pizza"],
            &["pizza", "margherita", "marinara", "calzone", "diavola", "capricciosa"],
            &["mozzarella", "fior di latte", "pomodoro"],
        ),
        DishTypeRule::new(
            "flatbread",
            &["piadineria", "piadina"],
            &["piadina", "piada", "crescione", "cassone"],
            &["squacquerone"],
        ),
        DishTypeRule::new(
            "pasta",
            &["pastificio", "trattoria", "osteria"],
            &[
                "pasta", "spaghetti", "penne", "rigatoni", "lasagne", "tagliatelle", "gnocchi",
                "ravioli", "tortellini", "carbonara", "amatriciana", "fusilli", "paccheri",
                "linguine", "trofie",
            ],
            &["parmigiano", "guanciale", "pecorino"],
        ),
        DishTypeRule::new(
            "sushi",
            &["sushi", "giapponese", "japan"],
            &["sushi", "sashimi", "nigiri", "uramaki", "hosomaki", "temaki", "gunkan"],
            &["alga nori", "wasabi", "riso"],
        ),
        DishTypeRule::new(
            "poke",
            &["poke", "poké"],
            &["poke", "poké", "bowl"],
            &["edamame", "avocado"],
        ),
        DishTypeRule::new(
            "hamburger",
            &["burger", "mcdonald's", "old wild west"],
            &["burger", "cheeseburger", "big mac", "whopper"],
            &["hamburger", "bacon", "cheddar"],
        ),
        DishTypeRule::new(
            "kebab",
            &["kebab", "kebap", "doner"],
            &["kebab", "kebap", "doner", "shawarma", "falafel"],
            &["carne di kebab", "salsa yogurt"],
        ),
        DishTypeRule::new(
            "meat",
            &["steakhouse", "braceria", "griglieria"],
            &["bistecca", "tagliata", "costata", "filetto", "grigliata", "arrosto", "cotoletta", "spiedino"],
            &["manzo", "maiale", "vitello", "pollo", "agnello"],
        ),
        DishTypeRule::new(
            "fish",
            &["pescheria", "frutti di mare", "ittico"],
            &["pesce", "frittura di pesce", "branzino", "orata", "polpo", "calamari", "baccalà"],
            &["salmone", "tonno", "gamberi", "pesce", "merluzzo"],
        ),
        DishTypeRule::new(
            "salad",
            &["insalateria", "salad"],
            &["insalata", "insalatona", "salad", "caesar"],
            &["lattuga", "rucola", "valeriana", "songino"],
        ),
        DishTypeRule::new(
            "ice_cream",
            &["gelateria"],
            &["gelato", "coppa gelato", "sorbetto", "granita", "affogato"],
            &["gelato", "sorbetto"],
        ),
        DishTypeRule::new(
            "dessert",
            &["pasticceria", "dolceria", "bakery"],
            &[
                "tiramisu", "tiramisù", "cheesecake", "torta", "panna cotta", "brownie", "cannolo",
                "crostata", "dolce", "muffin", "cookie", "croissant", "brioche",
            ],
            &["cioccolato", "zucchero", "nutella", "mascarpone", "crema pasticcera"],
        ),
        DishTypeRule::new(
            "beverage",
            &["caffetteria", "bubble tea"],
            &[
                "coca cola", "coca-cola", "fanta", "sprite", "acqua", "birra", "vino", "succo",
                "bibita", "bevanda", "red bull", "lattina", "spremuta", "smoothie", "tè freddo",
            ],
            &["acqua frizzante", "acqua naturale", "lattina", "bottiglia"],
        ),
    ]
}

/// Dish types that are never real dishes
pub fn non_dish_types() -> Vec<String> {
    words(&["beverage", "other", "altro", "bibite", "bevande"])
}

/// Bundle, menu and combo words that mark non-dish records
pub fn exclusion_keywords() -> Vec<String> {
    words(&[
        "menu", "menù", "box", "family box", "combo", "degustazione", "bevanda", "bevande",
        "bibita", "bibite", "drink", "coperto", "crea il tuo", "componi", "scegli",
        "personalizza", "offerta", "promo", "formula", "kit", "pacchetto",
    ])
}

/// Calories per 100 g of common ingredients
pub fn calories_per_100g() -> BTreeMap<String, f64> {
    [
        ("mozzarella", 280.0),
        ("patate", 77.0),
        ("pomodoro", 18.0),
        ("olio", 884.0),
        ("olio d'oliva", 884.0),
        ("pesto", 450.0),
        ("prezzemolo", 36.0),
        ("prosciutto", 145.0),
        ("salame", 300.0),
        ("pollo", 165.0),
        ("manzo", 250.0),
        ("tonno", 132.0),
        ("formaggio", 350.0),
        ("zucchine", 17.0),
        ("melanzane", 25.0),
        ("funghi", 22.0),
        ("rucola", 25.0),
        ("cipolla", 40.0),
        ("peperoni", 20.0),
        ("spinaci", 23.0),
        ("carciofi", 47.0),
        ("wurstel", 270.0),
        ("gorgonzola", 330.0),
        ("salsiccia", 300.0),
        ("bresaola", 151.0),
        ("speck", 250.0),
        ("ricotta", 170.0),
        ("acciughe", 210.0),
        ("salmone", 208.0),
        ("basilico", 23.0),
        ("origano", 265.0),
        ("farina", 364.0),
        ("pane", 265.0),
        ("burro", 717.0),
        ("uova", 143.0),
        ("soia", 446.0),
        ("gamberi", 99.0),
        ("granchio", 87.0),
        ("cozze", 172.0),
    ]
    .into_iter()
    .map(|(name, kcal)| (name.to_string(), kcal))
    .collect()
}

/// Average serving weight in grams per dish type
pub fn serving_weights() -> BTreeMap<String, f64> {
    [
        ("pizza", 300.0),
        ("hamburger", 300.0),
        ("meat", 280.0),
        ("salad", 250.0),
        ("fish", 280.0),
        ("pasta", 300.0),
        ("sushi", 200.0),
        ("kebab", 350.0),
        ("ice_cream", 150.0),
        ("dessert", 180.0),
        ("other", 300.0),
    ]
    .into_iter()
    .map(|(name, grams)| (name.to_string(), grams))
    .collect()
}

/// Ingredient terms that make a dish unhealthy
pub fn unhealthy_terms() -> Vec<String> {
    words(&[
        "salame", "wurstel", "salsiccia", "speck", "olio", "olio d'oliva", "formaggio",
        "gorgonzola", "mozzarella", "pesto", "fritto", "maionese", "panato", "burro",
    ])
}

/// Plausible calorie range per dish type or menu category
pub fn calorie_ranges() -> BTreeMap<String, String> {
    [
        ("pizza", "700-1200"),
        ("pasta", "400-800"),
        ("hamburger", "500-900"),
        ("flatbread", "300-600"),
        ("salad", "100-400"),
        ("dessert", "250-600"),
        ("antipasto", "150-500"),
        ("primo", "400-700"),
        ("secondo", "300-800"),
        ("contorno", "50-300"),
    ]
    .into_iter()
    .map(|(name, range)| (name.to_string(), range.to_string()))
    .collect()
}

/// Words that place an address in Milan
pub fn milan_keywords() -> Vec<String> {
    words(&["milano", "milan", "mi"])
}

/// Milan postal codes, 20121 through 20162
pub fn milan_postal_codes() -> Vec<String> {
    (20121..=20162).map(|code: u32| code.to_string()).collect()
}

/// Milan neighborhoods
pub fn milan_zones() -> Vec<String> {
    words(&[
        "navigli", "porta romana", "duomo", "isola", "brera", "citylife", "nolo", "citta studi",
        "bicocca", "affori", "lambrate", "precotto", "barona", "san siro", "quarto oggiaro",
        "ripamonti", "porta venezia", "porta genova", "loreto", "garibaldi",
    ])
}

/// Regex aliases that canonicalize chain restaurant names
pub fn restaurant_aliases() -> Vec<(String, String)> {
    [
        (r"mc\s*donald'?s?", "McDonald's"),
        (r"burger\s*king", "Burger King"),
        (r"pizza\s*express", "Pizza Express"),
        (r"sushi\s*daily", "Sushi Daily"),
        (r"old\s*wild\s*west", "Old Wild West"),
        (r"&", "e"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (pattern.to_string(), replacement.to_string()))
    .collect()
}
