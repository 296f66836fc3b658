use crate::reconcile::UNCLASSIFIED_TYPE;

/// Instruction sent alongside the rendered pages of a `total_pages` document.
pub fn build_prompt(total_pages: u32) -> String {
    format!(
        r#"Analyze this multi-page PDF document, which has {total_pages} pages, and identify all the distinct documents within it.
For each document type you identify, provide:
1. document_type: The type of document (e.g., "Aadhar Card", "Passport", "Bank Statement", "Invoice", etc.).
2. page_numbers: Array of page numbers that belong to this document (1-indexed).
3. suggested_filename: A clean filename for this document (without extension).
4. reason: Brief explanation of why you identified this as this document type.

Return the response as a JSON object with this structure:
{{
    "documents": [
        {{
            "document_type": "Document Type",
            "page_numbers": [1, 2],
            "suggested_filename": "document_name",
            "reason": "Explanation of identification"
        }}
    ],
    "total_pages": {total_pages},
    "analysis_confidence": "high/medium/low"
}}

IMPORTANT: You must account for every single page. The 'page_numbers' in your response must collectively include all pages from 1 to {total_pages}. Do not skip any pages. If you cannot classify a page, group it with other unclassified pages into a single document with the type "{UNCLASSIFIED_TYPE}"."#
    )
}
