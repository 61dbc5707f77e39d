//! Common test fixtures: sites, CRS definitions and WKT snippets.

/// Site coordinates as (latitude, longitude) in WGS84.
pub mod site {
    /// Downtown Los Angeles, inside UTM zone 11N.
    pub const LOS_ANGELES: (f64, f64) = (34.0522, -118.2437);

    /// On the central meridian of UTM zone 11 (easting is exactly 500 000 m).
    pub const ZONE_11_MERIDIAN: (f64, f64) = (34.0, -117.0);

    /// Far from any raster used in the tests.
    pub const LONDON: (f64, f64) = (51.5074, -0.1278);

    /// Text forms of a coordinate file.
    pub const LOS_ANGELES_TEXT: &str = "34.0522, -118.2437\n";
    pub const MALFORMED_TEXT: &str = "34.0522\n";
    pub const OUT_OF_RANGE_TEXT: &str = "95.0, -118.2437\n";
}

/// CRS definitions used across the tests.
pub mod crs {
    /// WGS 84 / UTM zone 11N
    pub const UTM_11N: u16 = 32611;

    /// WGS 84 / UTM zone 11N as a PROJ string.
    pub const UTM_11N_PROJ: &str = "+proj=utm +zone=11 +datum=WGS84 +units=m +no_defs";

    /// NAD83 / California zone 5 (ftUS) as a PROJ string.
    pub const CA_ZONE5_FTUS_PROJ: &str = "+proj=lcc +lat_0=33.5 +lon_0=-118 +lat_1=35.4666666666667 +lat_2=34.0333333333333 +x_0=2000000.0001016 +y_0=500000.0001016 +ellps=GRS80 +units=us-ft +no_defs";

    /// NAD83 / California zone 5 (ftUS)
    pub const CA_ZONE5_FTUS: u16 = 2229;

    /// California zone 5 as an ESRI `.prj` writes it: no AUTHORITY node.
    pub const CA_ZONE5_FTUS_ESRI_WKT: &str = r#"PROJCS["NAD_1983_StatePlane_California_V_FIPS_0405_Feet",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic"],PARAMETER["False_Easting",6561666.666666666],PARAMETER["False_Northing",1640416.666666667],PARAMETER["Central_Meridian",-118.0],PARAMETER["Standard_Parallel_1",34.03333333333333],PARAMETER["Standard_Parallel_2",35.46666666666667],PARAMETER["Latitude_Of_Origin",33.5],UNIT["Foot_US",0.3048006096012192]]"#;

    /// UTM zone 11N expressed in international feet.
    pub const UTM_11N_FT_PROJ: &str = "+proj=utm +zone=11 +datum=WGS84 +units=ft +no_defs";

    /// GeoJSON named-CRS URN for UTM zone 11N.
    pub const UTM_11N_URN: &str = "urn:ogc:def:crs:EPSG::32611";

    /// GeoJSON named-CRS URN for lon/lat WGS84.
    pub const CRS84_URN: &str = "urn:ogc:def:crs:OGC:1.3:CRS84";
}

/// EPSG unit-of-measure codes as written to `ProjLinearUnitsGeoKey`.
pub mod unit_codes {
    pub const METRE: u16 = 9001;
    pub const FOOT: u16 = 9002;
    pub const US_SURVEY_FOOT: u16 = 9003;
    pub const DEGREE: u16 = 9102;
}
