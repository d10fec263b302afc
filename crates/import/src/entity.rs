//! The importable entities, their flags and their columns.

use registry_core::CatalogKind;
use std::fmt;
use std::str::FromStr;

/// One importable entity. Declaration order is dependency order: catalogs first (rare
/// diseases before diagnoses), then patients, then the rows that reference patients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImportEntity {
    Country,
    Municipality,
    Occupation,
    Ethnicity,
    EthnicCommunity,
    Disability,
    DocumentType,
    HealthProvider,
    TreatmentModality,
    EntryRoute,
    AttentionReason,
    RareDisease,
    Diagnosis,
    Patient,
    PatientCountry,
    PatientDisability,
    Contact,
}

impl ImportEntity {
    pub const ALL: [ImportEntity; 17] = [
        ImportEntity::Country,
        ImportEntity::Municipality,
        ImportEntity::Occupation,
        ImportEntity::Ethnicity,
        ImportEntity::EthnicCommunity,
        ImportEntity::Disability,
        ImportEntity::DocumentType,
        ImportEntity::HealthProvider,
        ImportEntity::TreatmentModality,
        ImportEntity::EntryRoute,
        ImportEntity::AttentionReason,
        ImportEntity::RareDisease,
        ImportEntity::Diagnosis,
        ImportEntity::Patient,
        ImportEntity::PatientCountry,
        ImportEntity::PatientDisability,
        ImportEntity::Contact,
    ];

    /// Label used in reports and error messages.
    pub fn label(self) -> &'static str {
        match self {
            ImportEntity::Country => "pais",
            ImportEntity::Municipality => "municipio",
            ImportEntity::Occupation => "ocupacion",
            ImportEntity::Ethnicity => "etnia",
            ImportEntity::EthnicCommunity => "comunidad_etnica",
            ImportEntity::Disability => "discapacidad",
            ImportEntity::DocumentType => "tipo_documento",
            ImportEntity::HealthProvider => "entidad_prestadora_salud",
            ImportEntity::TreatmentModality => "modalidad_realizacion_tecnologia_salud",
            ImportEntity::EntryRoute => "via_ingreso_servicio_salud",
            ImportEntity::AttentionReason => "motivo_atencion",
            ImportEntity::RareDisease => "enfermedad_huerfana",
            ImportEntity::Diagnosis => "diagnostico",
            ImportEntity::Patient => "paciente",
            ImportEntity::PatientCountry => "paciente_pais",
            ImportEntity::PatientDisability => "paciente_discapacidad",
            ImportEntity::Contact => "contacto_servicio_salud",
        }
    }

    /// Command-line flag (without the leading dashes).
    pub fn flag(self) -> &'static str {
        match self {
            ImportEntity::Country => "pais",
            ImportEntity::Municipality => "municipio",
            ImportEntity::Occupation => "ocupacion",
            ImportEntity::Ethnicity => "etnia",
            ImportEntity::EthnicCommunity => "comunidad",
            ImportEntity::Disability => "discapacidad",
            ImportEntity::DocumentType => "tipo-doc",
            ImportEntity::HealthProvider => "entidad-prestadora",
            ImportEntity::TreatmentModality => "modalidad-tec",
            ImportEntity::EntryRoute => "via-ingreso",
            ImportEntity::AttentionReason => "motivo-atencion",
            ImportEntity::RareDisease => "enf-huerfana",
            ImportEntity::Diagnosis => "diagnostico",
            ImportEntity::Patient => "paciente",
            ImportEntity::PatientCountry => "paciente-pais",
            ImportEntity::PatientDisability => "paciente-discapacidad",
            ImportEntity::Contact => "contacto",
        }
    }

    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            ImportEntity::Country => &["codigo_pais", "nombre_pais"],
            ImportEntity::Municipality => &["codigo_municipio", "nombre_municipio"],
            ImportEntity::Occupation => &["codigo_ocupacion", "nombre_ocupacion"],
            ImportEntity::Ethnicity => &["identificador_etnia", "nombre_etnia"],
            ImportEntity::EthnicCommunity => {
                &["codigo_comunidad_etnica", "nombre_comunidad_etnica"]
            }
            ImportEntity::Disability => &["id_discapacidad", "nombre_discapacidad"],
            ImportEntity::DocumentType => &["codigo_tipo_documento", "nombre_tipo_documento"],
            ImportEntity::HealthProvider => &[
                "codigo_entidad_prestadora",
                "nombre_entidad_prestadora",
                "es_eps",
                "es_ips",
                "es_arl",
                "es_aseguradora",
            ],
            ImportEntity::TreatmentModality => &[
                "codigo_modalidad_realizacion_tecnologia_salud",
                "nombre_modalidad_realizacion_tecnologia_salud",
            ],
            ImportEntity::EntryRoute => &[
                "codigo_via_ingreso_usuario_servicio_salud",
                "nombre_via_ingreso_usuario_servicio_salud",
            ],
            ImportEntity::AttentionReason => {
                &["codigo_causa_motivo_atencion", "nombre_causa_motivo_atencion"]
            }
            ImportEntity::RareDisease => {
                &["codigo_enfermedad_huerfana", "nombre_enfermedad_huerfana"]
            }
            ImportEntity::Diagnosis => &["codigo_diagnostico", "nombre_diagnostico"],
            ImportEntity::Patient => &[
                "paciente_UUID",
                "numero_documento",
                "primer_nombre",
                "segundo_nombre",
                "primer_apellido",
                "segundo_apellido",
                "fecha_nacimiento",
                "sexo_biologico",
                "identidad_genero",
                "zona_territorial_residencia",
                "tipo_documento",
                "residencia",
                "ocupacion",
                "etnia",
                "comunidad_Etnica",
                "entidad_prestadora_salud",
            ],
            ImportEntity::PatientCountry => &["paciente_UUID", "codigo_pais"],
            ImportEntity::PatientDisability => &["paciente_UUID", "id_discapacidad"],
            ImportEntity::Contact => &[
                "contacto_UUID",
                "paciente_UUID",
                "entidad_prestadora_salud",
                "modalidad",
                "via_ingreso",
                "motivo_atencion",
                "diagnostico",
                "enfermedad_huerfana",
                "fecha_inicio_atencion",
                "fecha_triage",
                "grupo_servicio",
                "entorno_atencion",
                "clasificacion_triage",
                "tipo_diagnostico",
            ],
        }
    }

    /// The plain catalog this entity fills, if it is one.
    pub fn plain_catalog(self) -> Option<CatalogKind> {
        match self {
            ImportEntity::Country => Some(CatalogKind::Country),
            ImportEntity::Municipality => Some(CatalogKind::Municipality),
            ImportEntity::Occupation => Some(CatalogKind::Occupation),
            ImportEntity::Ethnicity => Some(CatalogKind::Ethnicity),
            ImportEntity::EthnicCommunity => Some(CatalogKind::EthnicCommunity),
            ImportEntity::Disability => Some(CatalogKind::Disability),
            ImportEntity::DocumentType => Some(CatalogKind::DocumentType),
            ImportEntity::TreatmentModality => Some(CatalogKind::TreatmentModality),
            ImportEntity::EntryRoute => Some(CatalogKind::EntryRoute),
            ImportEntity::AttentionReason => Some(CatalogKind::AttentionReason),
            ImportEntity::RareDisease => Some(CatalogKind::RareDisease),
            ImportEntity::HealthProvider
            | ImportEntity::Diagnosis
            | ImportEntity::Patient
            | ImportEntity::PatientCountry
            | ImportEntity::PatientDisability
            | ImportEntity::Contact => None,
        }
    }
}

impl fmt::Display for ImportEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ImportEntity {
    type Err = String;

    /// Accepts either the label or the flag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches("--");
        ImportEntity::ALL
            .into_iter()
            .find(|e| e.label() == wanted || e.flag() == wanted)
            .ok_or_else(|| format!("unknown import entity '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_sorted_in_dependency_order() {
        let mut sorted = ImportEntity::ALL;
        sorted.sort();
        assert_eq!(sorted, ImportEntity::ALL);
        assert!(ImportEntity::RareDisease < ImportEntity::Diagnosis);
        assert!(ImportEntity::Diagnosis < ImportEntity::Patient);
        assert!(ImportEntity::Patient < ImportEntity::Contact);
    }

    #[test]
    fn labels_and_flags_parse() {
        assert_eq!("--tipo-doc".parse::<ImportEntity>().unwrap(), ImportEntity::DocumentType);
        assert_eq!("paciente_pais".parse::<ImportEntity>().unwrap(), ImportEntity::PatientCountry);
        assert!("--planeta".parse::<ImportEntity>().is_err());
    }
}
