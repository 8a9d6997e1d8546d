pub const STYLIST: &str = include_str!("../data/prompts/stylist.txt");
pub const TRY_ON: &str = include_str!("../data/prompts/try_on.txt");

/// Aspect ratio requested for try-on composites.
pub const TRY_ON_ASPECT_RATIO: &str = "3:4";

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

pub fn stylist_prompt(query: &str, context: &str) -> String {
    render(STYLIST, &[("context", context), ("query", query)])
}

pub fn try_on_prompt(description: &str) -> String {
    render(
        TRY_ON,
        &[
            ("aspect_ratio", TRY_ON_ASPECT_RATIO),
            ("description", description),
        ],
    )
}
