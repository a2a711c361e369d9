//! Messages spliced into the context block by the retrievers.

/// The vector search succeeded but returned no rows.
pub const NO_RELEVANT_CHUNKS: &str =
    "Nenhuma informação relevante foi encontrada nos documentos da empresa para esta pergunta.";

/// The keyword ranker scored nothing above zero.
///
/// Placeholders: `{filenames}`
pub const NO_MATCHING_DOCUMENTS_TEMPLATE: &str = "Nenhum documento relevante encontrado para esta pergunta. Documentos disponíveis: {filenames}. Sugira ao usuário reformular a pergunta citando um desses documentos.";

/// There is nothing in the knowledge base at all.
pub const EMPTY_KNOWLEDGE_BASE: &str =
    "Nenhum documento foi carregado na base de conhecimento ainda.";

pub fn no_matching_documents(filenames: &[String]) -> String {
    NO_MATCHING_DOCUMENTS_TEMPLATE.replace("{filenames}", &filenames.join(", "))
}
