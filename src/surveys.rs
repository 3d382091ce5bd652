use clap::ValueEnum;

/// Evaluation forms that can be uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum SurveyKind {
    /// Student evaluation of teachers
    EEstud,
    /// Teacher self-evaluation, adjunct faculty
    AeDocCatedra,
    /// Teacher self-evaluation, non-adjunct faculty
    AeDocSinCatedra,
    /// Dean evaluation of tenured faculty
    EDecPlanta,
    /// Dean evaluation of adjunct faculty
    EDecCatedra,
}

impl SurveyKind {
    pub const ALL: [SurveyKind; 5] = [
        SurveyKind::EEstud,
        SurveyKind::AeDocCatedra,
        SurveyKind::AeDocSinCatedra,
        SurveyKind::EDecPlanta,
        SurveyKind::EDecCatedra,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SurveyKind::EEstud => "e-estud",
            SurveyKind::AeDocCatedra => "ae-doc-catedra",
            SurveyKind::AeDocSinCatedra => "ae-doc-sin-catedra",
            SurveyKind::EDecPlanta => "e-dec-planta",
            SurveyKind::EDecCatedra => "e-dec-catedra",
        }
    }

    pub fn schema(self) -> SurveyTableSchema {
        match self {
            SurveyKind::EEstud => SurveyTableSchema::new(
                "e_estud",
                &[
                    "ID_ENCUESTA_QUSUARIO",
                    "ID_GRUPO_DOCENTE",
                    "FACULTAD",
                    "PROGRAMA",
                    "GRUPO",
                    "DOCUMENTO_DOCENTE",
                    "NOMBRE_DOCENTE",
                    "CARGO_DOCENTE",
                    "ENCUESTA",
                    "ID_OPERARIO_U",
                    "FECHA_DILIGENCIAMIENTO",
                ],
                40,
            ),
            SurveyKind::AeDocCatedra => {
                SurveyTableSchema::new("ae_docente_catedra", SELF_EVALUATION_FIELDS, 31)
            }
            SurveyKind::AeDocSinCatedra => {
                SurveyTableSchema::new("ae_docente_sin_catedra", SELF_EVALUATION_FIELDS, 8)
            }
            SurveyKind::EDecPlanta => {
                SurveyTableSchema::new("e_decano_planta", DEAN_EVALUATION_FIELDS, 19)
            }
            SurveyKind::EDecCatedra => {
                SurveyTableSchema::new("e_decano_catedra", DEAN_EVALUATION_FIELDS, 8)
            }
        }
    }

    /// Route of the page that shows the upload result.
    pub fn status_page(self) -> &'static str {
        match self {
            SurveyKind::EEstud => "/carga_exitosa_estud",
            SurveyKind::AeDocCatedra => "/carga_exitosa_ae_doc_cat",
            SurveyKind::AeDocSinCatedra => "/carga_exitosa_ae_doc_sin_cat",
            SurveyKind::EDecPlanta => "/carga_exitosa_e_dec_planta",
            SurveyKind::EDecCatedra => "/carga_exitosa_e_dec_catedra",
        }
    }

    /// Dashboard page, relative to the configured dashboard base URL.
    pub fn dashboard_page(self) -> &'static str {
        match self {
            SurveyKind::EEstud => "e_estud_py.php",
            SurveyKind::AeDocCatedra => "ae_doc_cat_py.php",
            SurveyKind::AeDocSinCatedra => "ae_doc_sin_cat_py.php",
            SurveyKind::EDecPlanta => "e_dec_planta_py.php",
            SurveyKind::EDecCatedra => "e_dec_catedra_py.php",
        }
    }

    pub fn dashboard_url(self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.dashboard_page())
    }
}

const SELF_EVALUATION_FIELDS: &[&str] = &[
    "ID_ENCUESTA_QUSUARIO",
    "ID_DOCENTE",
    "FACULTAD",
    "PROGRAMA",
    "DOCUMENTO_DOCENTE",
    "NOMBRE_DOCENTE",
    "CARGO_DOCENTE",
    "ENCUESTA",
    "FECHA_DILIGENCIAMIENTO",
];

const DEAN_EVALUATION_FIELDS: &[&str] = &[
    "ID_ENCUESTA_QUSUARIO",
    "ID_DOCENTE",
    "FACULTAD",
    "PROGRAMA",
    "DOCUMENTO_EVALUADOR",
    "NOMBRE_EVALUADOR",
    "DOCUMENTO_DOCENTE",
    "NOMBRE_DOCENTE",
    "CARGO_DOCENTE",
    "ENCUESTA",
    "FECHA_DILIGENCIAMIENTO",
];

/// Target table plus its ordered insert columns. The autoincrement id is
/// never listed; the store assigns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyTableSchema {
    pub table_name: &'static str,
    pub columns: Vec<String>,
}

impl SurveyTableSchema {
    /// Fixed fields followed by `PREGUNTA1..=PREGUNTA{questions}`.
    pub fn new(table_name: &'static str, fields: &[&str], questions: usize) -> Self {
        let columns = fields
            .iter()
            .map(|f| f.to_string())
            .chain((1..=questions).map(|n| format!("PREGUNTA{n}")))
            .collect();
        Self {
            table_name,
            columns,
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// Report tables offered for download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    InformesFinales,
    InformesFinalesDuplicados,
}

pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

impl ReportKind {
    pub fn table_name(self) -> &'static str {
        match self {
            ReportKind::InformesFinales => "informes_finales",
            ReportKind::InformesFinalesDuplicados => "informes_finales_duplicados",
        }
    }

    pub fn download_name(self) -> &'static str {
        match self {
            ReportKind::InformesFinales => "Informes Finales.xlsx",
            ReportKind::InformesFinalesDuplicados => "Informes Finales Duplicados.xlsx",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn schemas_have_expected_widths() {
        assert_eq!(SurveyKind::EEstud.schema().width(), 51);
        assert_eq!(SurveyKind::AeDocCatedra.schema().width(), 40);
        assert_eq!(SurveyKind::AeDocSinCatedra.schema().width(), 17);
        assert_eq!(SurveyKind::EDecPlanta.schema().width(), 30);
        assert_eq!(SurveyKind::EDecCatedra.schema().width(), 19);
    }

    #[test]
    fn dean_adjunct_schema_ends_with_eight_questions() {
        let schema = SurveyKind::EDecCatedra.schema();
        assert_eq!(schema.table_name, "e_decano_catedra");
        assert_eq!(schema.columns[10], "FECHA_DILIGENCIAMIENTO");
        assert_eq!(schema.columns[11], "PREGUNTA1");
        assert_eq!(schema.columns.last().map(String::as_str), Some("PREGUNTA8"));
    }

    #[test]
    fn tables_and_columns_are_unique() {
        let tables: HashSet<_> = SurveyKind::ALL
            .iter()
            .map(|kind| kind.schema().table_name)
            .collect();
        assert_eq!(tables.len(), SurveyKind::ALL.len());

        for kind in SurveyKind::ALL {
            let schema = kind.schema();
            let columns: HashSet<_> = schema.columns.iter().collect();
            assert_eq!(columns.len(), schema.width(), "{}", kind.key());
        }
    }

    #[test]
    fn dashboard_url_joins_base() {
        assert_eq!(
            SurveyKind::EEstud.dashboard_url("http://localhost/evaluacion_docente/dashboard/"),
            "http://localhost/evaluacion_docente/dashboard/e_estud_py.php"
        );
    }

    #[test]
    fn report_downloads_are_named() {
        assert_eq!(ReportKind::InformesFinales.table_name(), "informes_finales");
        assert_eq!(
            ReportKind::InformesFinalesDuplicados.download_name(),
            "Informes Finales Duplicados.xlsx"
        );
    }
}
