#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionId {
    Whoami,
    Education,
    Experience,
    Projects,
    Skills,
    Comments,
}

impl SectionId {
    /// Id of the page element holding this section.
    pub fn dom_id(self) -> &'static str {
        match self {
            SectionId::Whoami => "whoami",
            SectionId::Education => "education",
            SectionId::Experience => "experience",
            SectionId::Projects => "projects",
            SectionId::Skills => "skills",
            SectionId::Comments => "comments",
        }
    }
}

pub struct CatalogEntry {
    pub filename: &'static str,
    pub section: SectionId,
    pub fragment: &'static str,
}

pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        filename: "whoami",
        section: SectionId::Whoami,
        fragment: "whoami-",
    },
    CatalogEntry {
        filename: "education.yaml",
        section: SectionId::Education,
        fragment: "education-",
    },
    CatalogEntry {
        filename: "experience.json",
        section: SectionId::Experience,
        fragment: "experience-",
    },
    CatalogEntry {
        filename: "projects.md",
        section: SectionId::Projects,
        fragment: "projects-",
    },
    CatalogEntry {
        filename: "skills.txt",
        section: SectionId::Skills,
        fragment: "skills-",
    },
    CatalogEntry {
        filename: "comments.log",
        section: SectionId::Comments,
        fragment: "comments-",
    },
];

pub const INITIAL_SECTION: SectionId = SectionId::Whoami;

pub fn filenames() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|entry| entry.filename)
}

pub fn lookup_file(filename: &str) -> Option<SectionId> {
    CATALOG
        .iter()
        .find(|entry| entry.filename == filename)
        .map(|entry| entry.section)
}

/// Resolves a `location.hash` value (with or without the leading `#`).
pub fn lookup_fragment(hash: &str) -> Option<SectionId> {
    let fragment = hash.strip_prefix('#').unwrap_or(hash);
    if fragment.is_empty() {
        return None;
    }
    CATALOG
        .iter()
        .find(|entry| entry.fragment == fragment)
        .map(|entry| entry.section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn filenames_keep_catalog_order() {
        let names: Vec<_> = filenames().collect();
        assert_eq!(
            names,
            vec![
                "whoami",
                "education.yaml",
                "experience.json",
                "projects.md",
                "skills.txt",
                "comments.log"
            ]
        );
    }

    #[test]
    fn catalog_maps_each_section_once() {
        let sections: HashSet<_> = CATALOG.iter().map(|entry| entry.section).collect();
        assert_eq!(sections.len(), CATALOG.len());
        let fragments: HashSet<_> = CATALOG.iter().map(|entry| entry.fragment).collect();
        assert_eq!(fragments.len(), CATALOG.len());
    }

    #[test]
    fn lookup_file_is_exact() {
        assert_eq!(lookup_file("education.yaml"), Some(SectionId::Education));
        assert_eq!(lookup_file("Education.yaml"), None);
        assert_eq!(lookup_file("education"), None);
    }

    #[test]
    fn lookup_fragment_accepts_leading_hash() {
        assert_eq!(lookup_fragment("#education-"), Some(SectionId::Education));
        assert_eq!(lookup_fragment("skills-"), Some(SectionId::Skills));
        assert_eq!(lookup_fragment("#education"), None);
        assert_eq!(lookup_fragment("#"), None);
        assert_eq!(lookup_fragment(""), None);
    }
}
