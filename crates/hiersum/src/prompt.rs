//! Prompts for chunk summaries and the final consolidation pass.
//!
//! Both prompts demand that technical detail survive: numbers, names,
//! identifiers, procedures, configuration values and direct quotes. The
//! output ceiling is stated as a word budget of half the output-token limit,
//! leaving room for the model's tokens-per-word ratio.

/// Opening line of every user prompt; the document text follows it.
pub const USER_PROMPT_PREFIX: &str = "content to summarize:\n\n";

/// Word ceiling stated in the prompts for a given output-token limit.
pub fn word_budget(max_output_tokens: usize) -> usize {
    max_output_tokens / 2
}

/// System prompt for summarizing one chunk.
pub fn chunk_system_prompt(max_output_tokens: usize) -> String {
    let words = word_budget(max_output_tokens);
    format!(
        "\
You are an expert in information preservation and technical documentation.
Your task is to create a dense, detailed retention of the input content with less than {words} words.

Critical rules:

1. PRESERVE ALL:
   - Technical specifications, numbers, and measurements
   - Names, identifiers, key terms, numeric/technical data
   - Procedural steps and sequences
   - Relationships and dependencies
   - Configuration details and parameters
   - Important direct quotes

2. Structure your response as:
   <METADATA>
   - Document type: (code/technical/narrative/documentation/other)
   - Key terms: [list important terms/identifiers]
   - Structure type: (hierarchical/sequential/reference/other)
   </METADATA>

   <CORE_CONTENT>
   [Detailed preservation of the content, maintaining original structure if possible]
   </CORE_CONTENT>

   <RELATIONSHIPS>
   [Dependencies, connections, cross-references found in the content]
   </RELATIONSHIPS>

3. Use direct quotes where precision matters
4. Maintain hierarchical structure if it exists
5. Keep lists, tables, or structured data in original format if feasible"
    )
}

/// System prompt for the single consolidation pass over converged text.
pub fn final_system_prompt(max_output_tokens: usize) -> String {
    let words = word_budget(max_output_tokens);
    format!(
        "\
You are creating the final consolidated summary of preserved information.
Preserve maximum detail and maintain a cohesive structure. Your response MUST contain less than {words} words.

Requirements:

1. DO NOT summarize away critical details
2. Use markdown for clarity
3. Preserve essential formatting
4. Keep direct quotes intact while not violating the word limit.
5. Maintain references, relationships, and any structured data if possible.
6. Keep ALL:
   - Technical specs, numeric values
   - Names and IDs
   - Procedural steps
   - Configuration details
   - Interrelationships
"
    )
}

/// User prompt for one chunk.
pub fn chunk_user_prompt(chunk: &str) -> String {
    format!("{USER_PROMPT_PREFIX}{chunk}\n")
}

/// User prompt for the final consolidation pass.
pub fn final_user_prompt(text: &str) -> String {
    format!("{USER_PROMPT_PREFIX}{text}")
}
