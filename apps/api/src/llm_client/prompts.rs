// Shared prompt fragments. Each module that calls the analysis service keeps
// its own prompts.rs next to it; this file holds the cross-cutting pieces.

/// Appended to every prompt that expects a structured reply.
pub const JSON_ONLY_INSTRUCTION: &str = "Respond with valid JSON only. \
    Do NOT include any text outside the JSON. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Grade-point table as stated to the service. Must agree with `catalog::Grade::points`.
pub const GRADE_SCALE_INSTRUCTION: &str =
    "A=4.0, A-=3.7, B+=3.3, B=3.0, B-=2.7, C+=2.3, C=2.0, C-=1.7, D=1.0, F=0 (P grades carry units but are excluded from GPA)";
