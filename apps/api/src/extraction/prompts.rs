// Skill extraction LLM prompt templates.

pub const SKILL_EXTRACTION_SYSTEM: &str = "\
You are a CV skill extraction assistant. \
Extract technical skills from the provided CV text and return them as a JSON array of strings. \
Focus on hard skills like programming languages, frameworks, tools, databases, cloud platforms, and certifications. \
Exclude soft skills and general terms. \
Return only the JSON object in this exact format: {\"skills\": [\"skill1\", \"skill2\", \"skill3\"]}";

pub const SKILL_EXTRACTION_PROMPT: &str = "CV Text:\n{cv_text}";
