//! Analysis prompts.

use crate::types::DocumentKind;

const HIGHWAY_ENGINEERING_PROMPT: &str = r#"Give me full deep analysis of this document as per below subtasks do not skip any TCS or Clause and continue without my intervention for anything.

<subtask1>
---------------------------------------
System prompt : You are a intelligent contractual data extractor and classifier.
User: Extract All the Clauses and its sub-clauses, Tables in schedule B tagging them intelligently to the category of information.
</subtask1>

This is a new subtask after end of previous subtask as denoted by closing of previous subtask and start of new subtask

<subtask2>
---------------------------------------
System prompt : You are a highway technical engineer looking at Highway Cross Sections.
User: Extract All the Elements from each of the cross sections and corresponding each dimensions with label " width" , " height" , " slope value in percent" and do not infer anything if the dimension or detail is not present just give "not present" and do not confuse different slopes with each other (eg. slope of embankment is different from slope of carriageway) and add a label in median for type of Median in the cross section as well. Also classify their location LHS or RHS.
</subtask2>

This is a new subtask after end of previous subtask as denoted by closing of previous subtask and start of new subtask

<subtask3>
---------------------------------------
System Prompt : You are a IRC Code and MoRTH Orange Book Expert.
User: Cross check all the extracted information from <subtask1> with relevant IRC standards. Then Cross check all the extracted information from <subtask2> with relevant IRC standards. and do not club two cross sections in the output. Format output in a table for each cross section as | Element | Dimension | Relevant IRC Code and its Clause | Your Remarks |
---------------------------------------
</subtask3>

This is a new subtask after end of previous subtask as denoted by closing of previous subtask and start of new subtask

<subtask4>
---------------------------------------
System Prompt : You are a intelligent reviewer with high reasoning.
User: You cross check extracted clause in <subtask1> with extracted information in <subtask2> and highlight differences.
---------------------------------------
</subtask4>"#;

const GENERAL_PROMPT: &str = r#"Analyze this highway engineering document for compliance and accuracy:

1. **Document Classification**: Identify the document type and key sections
2. **Content Extraction**: Extract all relevant technical data, specifications, and measurements
3. **Compliance Review**: Check against applicable IRC codes and MoRTH standards
4. **Issues Identification**: Highlight any compliance issues, missing information, or potential problems
5. **Recommendations**: Provide specific recommendations for improvement or correction

Please provide a detailed analysis with compliance scoring and actionable insights."#;

/// Base instructions for analysing a document of the given kind.
pub fn analysis_prompt(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::HighwayEngineering => HIGHWAY_ENGINEERING_PROMPT,
        DocumentKind::General => GENERAL_PROMPT,
    }
}

/// Instructions sent alongside an uploaded PDF.
pub fn pdf_prompt(file_name: &str) -> String {
    format!(
        "{}\nDOCUMENT: {}\nANALYSIS REQUIREMENTS:\n\
         1. Apply all 4 subtasks to the entire document\n\
         2. Pay special attention to cross-sections and IRC codes\n\
         3. Include raw measurements from drawings",
        HIGHWAY_ENGINEERING_PROMPT, file_name
    )
}

/// Prompt for analysing already-extracted text.
pub fn text_prompt(kind: DocumentKind, content: &str) -> String {
    format!("{}\n\nDocument Content:\n{}", analysis_prompt(kind), content)
}

/// Prompt for answering a question about a document.
pub fn question_prompt(question: &str, context: &str) -> String {
    format!(
        "Based on the following highway engineering document content, please answer this question: {}\n\n\
         Document Content:\n{}\n\n\
         Please provide a comprehensive answer with specific references to the document content.",
        question, context
    )
}
