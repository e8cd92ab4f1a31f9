//! Fixed RSA key pair shared by the security tests.
//!
//! Generating a 2048-bit key takes seconds in debug builds, so tests load
//! this pair instead.

/// SubjectPublicKeyInfo DER, 2048-bit RSA
pub(crate) const RSA_PUBLIC_KEY_DER_HEX: &[&str] = &[
    "30820122300d06092a864886f70d01010105000382010f003082010a02820101",
    "00b809a7598284ec4f06fa1cb2e1389353bb7dd4ac881af82511e4fa1d61245b",
    "82cacd72cedb66b58d54bdfb23fde88eafa7b379be94b5b7ba17b605aece43be",
    "3bce6eea07dbbf0a7eebbcc97b623cf5e1cee1d98d9cfe1fc7f8fb59c0940b2c",
    "d97dbc96ebb879228a2ea0121d4207b65ddbe1f6b15d7b1f54521ca3119bf9eb",
    "beb395caa5873f31181ac99901ecaa90fd8a36355e1281be8488a10d192a4a66",
    "c1593c41833d3db8d4ab3490063e1a6174be04f57a691b9d56fc83b760c15e9d",
    "8534fd021aba2c0972a74a5e18bfc058a749344661590ee26e9ed2dbfd722f3c",
    "47cc5f9962ee0df31f30252092154b04fe15191ddc7e5c102152219154608b92",
    "410203010001",
];

/// PKCS#1 RSAPrivateKey DER matching `RSA_PUBLIC_KEY_DER_HEX`
pub(crate) const RSA_PRIVATE_KEY_DER_HEX: &[&str] = &[
    "308204a50201000282010100b809a7598284ec4f06fa1cb2e1389353bb7dd4ac",
    "881af82511e4fa1d61245b82cacd72cedb66b58d54bdfb23fde88eafa7b379be",
    "94b5b7ba17b605aece43be3bce6eea07dbbf0a7eebbcc97b623cf5e1cee1d98d",
    "9cfe1fc7f8fb59c0940b2cd97dbc96ebb879228a2ea0121d4207b65ddbe1f6b1",
    "5d7b1f54521ca3119bf9ebbeb395caa5873f31181ac99901ecaa90fd8a36355e",
    "1281be8488a10d192a4a66c1593c41833d3db8d4ab3490063e1a6174be04f57a",
    "691b9d56fc83b760c15e9d8534fd021aba2c0972a74a5e18bfc058a749344661",
    "590ee26e9ed2dbfd722f3c47cc5f9962ee0df31f30252092154b04fe15191ddc",
    "7e5c102152219154608b9241020301000102820101008a05fb737f16af9fa94c",
    "e53f26f8664dd2fcd106c060f19fe3a6c60a48b39aca21cd2980883da485a57b",
    "82218128ebf24324b076c552efc2ea4b824192c26da6aef0b22648a1237f02cf",
    "a89017a23e8a26bd6d8aeea60c31cec2bb9259b573e27d9175e2bd8c63e21c8b",
    "c26a1cfe69c044cb5857b71342f0db504ce045098fca458a06fe98d122f55a9a",
    "df8917ca20cc12a9093dd5f7e3eb084ac412c0b9476c795066a3f8af2cfab46b",
    "ec03adcbda240c52078788c021f302e824440fcda0ad2f1b79ab6b494ae63bd0",
    "adc348b9f7f13409eb7ac0d50d39d845ce367ad8de3cb02196978aff8b23604f",
    "f03dd78ff32ccb1d483f86c4a900f2232d724d66a50102818100dc4f99440d7f",
    "59461e8fe72d8ddd54c0f7fa460d9d3503f17c12f35a9d83cfdd37217cb7eec3",
    "39d2758fb22d6fecc60355d70067d39ba268506f9e28a476392bb265cc728293",
    "a0cf10056a75ca853599b0a6c6ef4c4d997d2c380121b531ac8054c4184bfdef",
    "b33022515aea7d9bb29dcbba3fc01a6bcdb0e62f0433d73a497102818100d5d9",
    "c9701a13b3392402eeb0bb841712c6bd6573e9345d43ffdcf855af2ab9e1fa71",
    "654e500fa43be568f24971af1588d7afc49d94846b5b10d5c0aa0c136299c08b",
    "fc900f87404d5888bde2ba3e7e2dd769a93c096431b6cc4d1f23b69e65d681dc",
    "85cc1ef10b8438ab935f9f924e9346956b3eb6c31bd769a10a973778edd10281",
    "803318c313658e03c69f9000ae3019056f3c146feaf86b335eeec7f6692ddf44",
    "76aa32ba1a6ee618a317611c922d435d29a8df14d8ffdb38efb8b82a96828e68",
    "f4198c42becc4a3121d5356c5ba57cffd1858728dc9775e803801dfd25344131",
    "211287e89ab76ac0c4893115450d9ceef06a2fe85945c77b0d6c55bb43cac75a",
    "0102818100abf4d5cf788882c2ddbc25e6a2c1d233dcef0a972bdc596a86614e",
    "a6c79599a6a6556c5a8e722563ac52b910698399d3516c1ab3836aff5058b728",
    "9713e2ba945b89b4eaba31cd78e44a003642006241c6474637ea6d50b4668f55",
    "0cc89991d5ecd2401c247d3aff74fa3224e0112b71ad7e14a07721684fccb61b",
    "e80049132102818100b61873592c4f92aca22e5fb6be785d47710492f0d7e8c5",
    "7a846bb8b4301fd80d58d06480a7211a480037d61971bb91209de2c3ecdb361c",
    "ca487d0332741e6573029073d83fb55235791cee93a3328bed8998f10cd812f2",
    "897f3223ec6766528389995e422b424b84501b3e476d74fbd1a610206c6ebe44",
    "3fb9febc8ddacbea8f",
];

pub(crate) fn rsa_public_key_der() -> Vec<u8> {
    hex::decode(RSA_PUBLIC_KEY_DER_HEX.concat()).unwrap()
}

pub(crate) fn rsa_private_key_der() -> Vec<u8> {
    hex::decode(RSA_PRIVATE_KEY_DER_HEX.concat()).unwrap()
}
