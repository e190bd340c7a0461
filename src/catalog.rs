use std::sync::LazyLock;

use crate::models::Product;

struct Entry {
    id: &'static str,
    name: &'static str,
    sku: &'static str,
    price: f64,
    dosage: &'static str,
    purity: &'static str,
    form: &'static str,
    storage: &'static str,
    description: &'static str,
    full_description: &'static str,
    image: &'static str,
    coa_file: &'static str,
    in_stock: bool,
    lead_time: &'static str,
    category: &'static str,
    featured: bool,
}

impl Entry {
    fn to_product(&self) -> Product {
        Product {
            id: self.id.to_string(),
            name: self.name.to_string(),
            sku: self.sku.to_string(),
            price: self.price,
            dosage: self.dosage.to_string(),
            purity: self.purity.to_string(),
            form: self.form.to_string(),
            storage: self.storage.to_string(),
            description: self.description.to_string(),
            full_description: self.full_description.to_string(),
            image: self.image.to_string(),
            coa_file: self.coa_file.to_string(),
            in_stock: self.in_stock,
            lead_time: self.lead_time.trim().to_string(),
            category: self.category.to_string(),
            featured: self.featured,
        }
    }
}

const FREEZER: &str = "Store at −20°C";
const POWDER: &str = "Lyophilized powder";

const ENTRIES: &[Entry] = &[
    Entry {
        id: "peptide-001",
        name: "GLP-3 RT 30mg",
        sku: "AMN-reta-30MG",
        price: 149.99,
        dosage: "30 mg vial",
        purity: "≥99% HPLC",
        form: "medical vial",
        storage: "store at room temperature",
        description: "High-purity research peptide for laboratory use",
        full_description: "GLP-3 RT is a high-quality research peptide supplied as vials. Manufactured under strict quality control with verified purity. Suitable for in vitro research applications only.",
        image: "glp-rt30.jpg",
        coa_file: "coa-peptide-001.pdf",
        in_stock: true,
        lead_time: "4 days",
        category: "Standard",
        featured: true,
    },
    Entry {
        id: "peptide-002",
        name: "GLP-3 RT",
        sku: "AMN-P002-5MG",
        price: 279.99,
        dosage: "10 mg vial",
        purity: "≥99% HPLC",
        form: "lab vial",
        storage: FREEZER,
        description: "Premium research peptide for advanced studies",
        full_description: "Peptide-002 offers excellent purity for demanding research applications. Each vial contains lyophilized peptide with comprehensive COA documentation.",
        image: "reta10.jpg",
        coa_file: "coa-peptide-002.pdf",
        in_stock: true,
        lead_time: "24-72 hours",
        category: "Standard",
        featured: true,
    },
    Entry {
        id: "peptide-003",
        name: "Peptide-003",
        sku: "AMN-P003-10MG",
        price: 499.99,
        dosage: "10 mg vial",
        purity: "≥98% HPLC",
        form: POWDER,
        storage: FREEZER,
        description: "High-capacity research peptide vial",
        full_description: "Peptide-003 provides a larger quantity for extended research programs. Manufactured with stringent quality controls and supplied with complete analytical documentation.",
        image: "reta30.jpg",
        coa_file: "coa-peptide-003.pdf",
        in_stock: true,
        lead_time: "24-72 hours",
        category: "Standard",
        featured: false,
    },
    Entry {
        id: "peptide-004",
        name: "Peptide-004",
        sku: "AMN-P004-2MG",
        price: 169.99,
        dosage: "2 mg vial",
        purity: "≥97% HPLC",
        form: POWDER,
        storage: FREEZER,
        description: "Specialized research peptide for laboratory studies",
        full_description: "Peptide-004 is optimized for specific research applications requiring high purity standards. Complete analytical documentation provided.",
        image: "GLOW70.jpg",
        coa_file: "coa-peptide-004.pdf",
        in_stock: true,
        lead_time: "24-72 hours",
        category: "Specialized",
        featured: false,
    },
    Entry {
        id: "peptide-005",
        name: "Peptide-005",
        sku: "AMN-P005-5MG",
        price: 299.99,
        dosage: "5 mg vial",
        purity: "≥99% HPLC",
        form: POWDER,
        storage: FREEZER,
        description: "Ultra-high purity research peptide",
        full_description: "Peptide-005 offers exceptional purity levels for critical research applications. Manufactured using advanced purification techniques with full traceability.",
        image: "GLP2-TRZ.jpg",
        coa_file: "coa-peptide-005.pdf",
        in_stock: true,
        lead_time: "48-96 hours",
        category: "Premium",
        featured: true,
    },
    Entry {
        id: "peptide-006",
        name: "Peptide-006",
        sku: "AMN-P006-2MG",
        price: 159.99,
        dosage: "2 mg vial",
        purity: "≥96% HPLC",
        form: POWDER,
        storage: FREEZER,
        description: "Reliable research peptide for standard protocols",
        full_description: "Peptide-006 provides consistent quality for routine laboratory research. Each batch is thoroughly tested and documented.",
        image: "GLP2_TRZ30.jpg",
        coa_file: "coa-peptide-006.pdf",
        in_stock: true,
        lead_time: "24-72 hours",
        category: "Standard",
        featured: false,
    },
    Entry {
        id: "peptide-007",
        name: "Peptide-007",
        sku: "AMN-P007-5MG",
        price: 319.99,
        dosage: "5 mg vial",
        purity: "≥98% HPLC",
        form: POWDER,
        storage: FREEZER,
        description: "Advanced research peptide for complex studies",
        full_description: "Peptide-007 is designed for sophisticated research protocols requiring high purity and stability. Complete quality documentation included.",
        image: "hero-lab.jpg",
        coa_file: "coa-peptide-007.pdf",
        in_stock: true,
        lead_time: "24-72 hours",
        category: "Specialized",
        featured: false,
    },
    Entry {
        id: "peptide-008",
        name: "Peptide-008",
        sku: "AMN-P008-10MG",
        price: 549.99,
        dosage: "10 mg vial",
        purity: "≥99% HPLC",
        form: POWDER,
        storage: FREEZER,
        description: "Premium high-capacity research peptide",
        full_description: "Peptide-008 combines ultra-high purity with large quantity for extensive research programs. Manufactured under the strictest quality standards.",
        image: "aminoLogo.jpg",
        coa_file: "coa-peptide-008.pdf",
        in_stock: true,
        lead_time: "48-96 hours",
        category: "Premium",
        featured: true,
    },
    Entry {
        id: "kit-006",
        name: "GLP-3 RT 30mg kit",
        sku: "AMN-KIT-RETA-30MG",
        price: 149.99,
        dosage: "10 30mg vials",
        purity: "≥99% HPLC",
        form: "10 medical vials",
        storage: "store at room temperature",
        description: "High-purity research peptide for laboratory use",
        full_description: "Kit of ten GLP-3 RT 30mg vials. Manufactured under strict quality control with verified purity. Suitable for in vitro research applications only.",
        image: "glp-rt30.jpg",
        coa_file: "coa-peptide-001.pdf",
        in_stock: false,
        lead_time: "4 days",
        category: "Kit",
        featured: true,
    },
    Entry {
        id: "kit-007",
        name: "GLP-3 RT 10mg kit",
        sku: "AMN-KIT-RETA-10MG",
        price: 499.99,
        dosage: "10 10mg vials",
        purity: "≥99% HPLC",
        form: "10 lab vials",
        storage: FREEZER,
        description: "Premium research peptide for advanced studies",
        full_description: "Kit of ten GLP-3 RT 10mg vials with comprehensive COA documentation.",
        image: "reta10.jpg",
        coa_file: "coa-peptide-002.pdf",
        in_stock: false,
        lead_time: "24-72 hours",
        category: "Kit",
        featured: true,
    },
    Entry {
        id: "kit-008",
        name: "GLP-2 TRZ 30mg kit",
        sku: "AMN-KIT-TRZ-30MG",
        price: 499.99,
        dosage: "10 30mg vials",
        purity: "≥99% HPLC",
        form: "10 medical vials",
        storage: FREEZER,
        description: "High-capacity research peptide vial",
        full_description: "Kit of ten GLP-2 TRZ 30mg vials supplied with complete analytical documentation.",
        image: "GLP2_TRZ30.jpg",
        coa_file: "coa-peptide-003.pdf",
        in_stock: false,
        lead_time: "24-72 hours",
        category: "Kit",
        featured: false,
    },
    Entry {
        id: "kit-009",
        name: "GLOW 70mg kit",
        sku: "AMN-KIT-GLOW-70MG",
        price: 499.99,
        dosage: "10 70mg vials",
        purity: "≥99% HPLC",
        form: "10 medical vials",
        storage: FREEZER,
        description: "Specialized research peptide for laboratory studies",
        full_description: "GLOW is optimized for specific research applications requiring high purity standards. Complete analytical documentation provided.",
        image: "GLOW70.jpg",
        coa_file: "coa-peptide-004.pdf",
        in_stock: false,
        lead_time: "24-72 hours",
        category: "Kit",
        featured: false,
    },
    Entry {
        id: "kit-010",
        name: "GLP-2 TRZ 60mg kit",
        sku: "AMN-KIT-TRZ-60MG",
        price: 899.99,
        dosage: "10 60mg vials",
        purity: "≥99% HPLC",
        form: "10 medical vials",
        storage: FREEZER,
        description: "Ultra-high purity research peptide",
        full_description: "GLP-2 TRZ offers exceptional purity levels for critical research applications. Manufactured using advanced purification techniques with full traceability.",
        image: "GLP2-TRZ.jpg",
        coa_file: "coa-peptide-005.pdf",
        in_stock: false,
        lead_time: "48-96 hours",
        category: "Kit",
        featured: true,
    },
    Entry {
        id: "kit-011",
        name: "NAD+ 500mg kit",
        sku: "AMN-KIT-NAD-500MG",
        price: 499.99,
        dosage: "10 500 mg vials",
        purity: "≥99% HPLC",
        form: "10 medical vials",
        storage: FREEZER,
        description: "Reliable research peptide for standard protocols",
        full_description: "NAD+ provides consistent quality for routine laboratory research. Each batch is thoroughly tested and documented.",
        image: "nad1.jpg",
        coa_file: "coa-peptide-006.pdf",
        in_stock: false,
        lead_time: "24-72 hours",
        category: "Kit",
        featured: false,
    },
];

static PRODUCTS: LazyLock<Vec<Product>> =
    LazyLock::new(|| ENTRIES.iter().map(Entry::to_product).collect());

#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog;

impl Catalog {
    pub fn all(&self) -> &'static [Product] {
        PRODUCTS.as_slice()
    }

    pub fn find(&self, id: &str) -> Option<&'static Product> {
        PRODUCTS.iter().find(|p| p.id == id)
    }

    pub fn filter(&self, category: Option<&str>, featured: Option<bool>) -> Vec<&'static Product> {
        PRODUCTS
            .iter()
            .filter(|p| category.is_none_or(|c| p.category.eq_ignore_ascii_case(c)))
            .filter(|p| featured.is_none_or(|f| p.featured == f))
            .collect()
    }
}
