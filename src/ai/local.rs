/// Canned farming advice used when no model is loaded.

const PUNJAB: &str = "Based on Punjab's climate, I recommend:\n\n\
1. **Rice (Kharif season)** - Ideal for humid conditions\n\
2. **Wheat (Rabi season)** - Main winter crop\n\
3. **Cotton** - Grows well in hot weather\n\
4. **Sugarcane** - Thrives in humid conditions\n\
5. **Maize** - Suitable for summer\n\n\
Punjab's fertile soil and irrigation facilities make these crops highly profitable.";

const WEATHER: &str = "For current weather conditions:\n\n\
🌞 **Sunny weather**: Great for wheat, cotton, and vegetables\n\
🌧️ **Rainy season**: Perfect for rice cultivation\n\
❄️ **Winter**: Ideal for wheat and mustard\n\n\
Always check local weather forecasts before planting!";

const PEST: &str = "To protect crops from pests:\n\n\
1. Use **integrated pest management (IPM)**\n\
2. Rotate crops regularly\n\
3. Maintain field hygiene\n\
4. Use neem-based organic pesticides\n\
5. Monitor fields weekly for early detection\n\
6. Encourage natural predators like ladybugs";

const FERTILIZER: &str = "For healthy crop growth:\n\n\
🌱 **Nitrogen (N)**: Promotes leaf growth\n\
🌾 **Phosphorus (P)**: Supports root development\n\
🍅 **Potassium (K)**: Improves fruit quality\n\n\
Use NPK ratio based on your crop type. Organic compost is also excellent!";

const WATER: &str = "Watering guidelines:\n\n\
💧 Most vegetables need 1-2 inches per week\n\
💧 Water early morning or evening\n\
💧 Deep watering is better than frequent shallow watering\n\
💧 Check soil moisture before watering\n\
💧 Use drip irrigation for efficiency";

pub const DEFAULT_HELP: &str = "I'm your AI farming assistant! 🌾\n\n\
Ask me about:\n\
- Crop recommendations for your region\n\
- Weather-based farming advice\n\
- Pest management solutions\n\
- Fertilizer guidance\n\
- Watering schedules\n\
- Growing tips\n\n\
What would you like to know?";

type Predicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// One entry of the table: a test on the lowercased message and the answer it selects.
pub struct Rule {
    label: String,
    predicate: Predicate,
    response: String,
}

impl Rule {
    pub fn new<P>(label: &str, predicate: P, response: &str) -> Self
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.to_string(),
            predicate: Box::new(predicate),
            response: response.to_string(),
        }
    }

    /// Matches when the keyword appears anywhere in the message.
    pub fn keyword(keyword: &str, response: &str) -> Self {
        let needle = keyword.to_lowercase();
        Self::new(keyword, move |message| message.contains(&needle), response)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    fn matches(&self, lowered: &str) -> bool {
        (self.predicate)(lowered)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("label", &self.label).finish_non_exhaustive()
    }
}

/// Ordered rules; the first match wins.
#[derive(Debug)]
pub struct RuleTable {
    rules: Vec<Rule>,
    fallback: String,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>, fallback: &str) -> Self {
        Self {
            rules,
            fallback: fallback.to_string(),
        }
    }

    /// The farming topics shipped with the app.
    pub fn farming() -> Self {
        Self::new(
            vec![
                Rule::keyword("punjab", PUNJAB),
                Rule::keyword("weather", WEATHER),
                Rule::keyword("pest", PEST),
                Rule::keyword("fertilizer", FERTILIZER),
                Rule::keyword("water", WATER),
            ],
            DEFAULT_HELP,
        )
    }

    pub fn lookup(&self, message: &str) -> &str {
        self.find(message)
            .map(Rule::response)
            .unwrap_or(self.fallback.as_str())
    }

    /// First matching rule, if any.
    pub fn find(&self, message: &str) -> Option<&Rule> {
        let lowered = message.to_lowercase();
        self.rules.iter().find(|rule| rule.matches(&lowered))
    }

    pub fn topics(&self) -> Vec<&str> {
        self.rules.iter().map(Rule::label).collect()
    }
}
