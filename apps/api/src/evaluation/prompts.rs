// Prompt templates for the three evaluation steps.
// Placeholders are replaced with `str::replace` before sending.

/// Step 1. Replace `{resume_text}`.
pub const RESUME_SUMMARY_PROMPT: &str = "\
You are an expert HR analyst. Extract and summarize key candidate details:
- Name (if found)
- Total experience
- Technical skills
- Soft skills
- Notable projects or achievements
- Education
Resume: {resume_text}
Return summary as bullet points.";

/// Step 2. Replace `{hr_profile_json}` and `{candidate_summary}`.
pub const FIT_EVALUATION_PROMPT: &str = "\
You are an AI recruitment evaluator.
Compare the HR requirements and candidate profile below:

HR Requirements: {hr_profile_json}
Candidate Profile: {candidate_summary}

Return a detailed evaluation including:
- Skill Match %
- Experience Match %
- Missing Skills
- Cultural Fit (High / Medium / Low)
- Overall Fit Score %
- Short reasoning (2-3 lines)";

/// Step 3. Replace `{fit_evaluation}`.
pub const HR_ADVICE_PROMPT: &str = "\
You are an AI HR advisor with emotional intelligence.
Based on the evaluation below, provide the final hiring recommendation.

{fit_evaluation}

Return in markdown format:
1. **Recommendation:** Hire / Consider / Reject
2. **Top Strengths**
3. **Weak Areas**
4. **Improvements for Candidate**
5. **Tone & Personality Analysis**";
