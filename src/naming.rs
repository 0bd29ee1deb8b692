//! Artifact filenames.
//!
//! Every generated document is named `<label>_<institution>.<ext>`, where the
//! institution part is reduced to ASCII letters, digits and underscores:
//!
//! - `"Escola Estadual São José"` → `Escola_Estadual_Sao_Jose`
//! - `"  C.M.E.I. (Centro)  "` → `C_M_E_I_Centro`
//! - `"—"` → the configured fallback name

use crate::text::base_letter;
use crate::types::DocumentFormat;

/// Reduce an institution name to a filename-safe token.
///
/// Accented letters lose their accent, every run of other characters becomes
/// one `_`, and leading/trailing underscores are dropped. Returns `fallback`
/// when nothing survives.
pub fn sanitize_institution(name: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars().map(base_letter) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<label>_<sanitized institution>.<ext>`
pub fn artifact_filename(
    label: &str,
    institution: &str,
    fallback: &str,
    format: DocumentFormat,
) -> String {
    format!(
        "{label}_{}.{}",
        sanitize_institution(institution, fallback),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_become_underscores() {
        assert_eq!(sanitize_institution("Escola Municipal", "x"), "Escola_Municipal");
    }

    #[test]
    fn accents_are_folded() {
        assert_eq!(
            sanitize_institution("Escola Estadual São José", "x"),
            "Escola_Estadual_Sao_Jose"
        );
        assert_eq!(sanitize_institution("CRECHE ÇÃO", "x"), "CRECHE_CAO");
    }

    #[test]
    fn punctuation_runs_collapse_and_edges_trim() {
        assert_eq!(sanitize_institution("  C.M.E.I. (Centro)  ", "x"), "C_M_E_I_Centro");
        assert_eq!(sanitize_institution("a -- b", "x"), "a_b");
    }

    #[test]
    fn empty_result_uses_fallback() {
        assert_eq!(sanitize_institution("", "sem_instituicao"), "sem_instituicao");
        assert_eq!(sanitize_institution(" — ", "sem_instituicao"), "sem_instituicao");
        assert_eq!(sanitize_institution("漢字", "sem_instituicao"), "sem_instituicao");
    }

    #[test]
    fn filename_combines_label_name_and_extension() {
        assert_eq!(
            artifact_filename("relatorio_fotografico", "Escola 1", "sem", DocumentFormat::Pdf),
            "relatorio_fotografico_Escola_1.pdf"
        );
        assert_eq!(
            artifact_filename("relatorio_fotografico", "", "sem_instituicao", DocumentFormat::Docx),
            "relatorio_fotografico_sem_instituicao.docx"
        );
    }
}
